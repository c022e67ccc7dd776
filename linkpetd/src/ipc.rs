//! Line-delimited JSON control socket.
//!
//! One request per line, one response per line. A malformed line gets an
//! `Error` response and the connection stays open.

use linkpet::engine::EngineView;
use linkpet::snapshot::DiaryEntry;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::driver::{DriverError, DriverHandle};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    GetState,
    StartPolling,
    StopPolling,
    SubmitAnswer {
        #[serde(default)]
        question_index: Option<usize>,
        answer_index: u32,
    },
    OpenViewer,
    DismissPrompt,
    CloseViewer,
    Restart,
    NamePet {
        name: String,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    State(Box<EngineView>),
    Entries { entries: Vec<DiaryEntry> },
    Success { message: String },
    Error { message: String },
}

impl Response {
    fn success(message: impl Into<String>) -> Self {
        Response::Success {
            message: message.into(),
        }
    }
}

impl From<DriverError> for Response {
    fn from(e: DriverError) -> Self {
        Response::Error {
            message: e.to_string(),
        }
    }
}

/// Accepts clients until the driver stops.
pub async fn serve(listener: TcpListener, handle: DriverHandle) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        if !handle.is_running() {
            return Ok(());
        }
        debug!(%peer, "client connected");
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, handle).await {
                warn!(%peer, error = %e, "client error");
            }
        });
    }
}

async fn handle_client(
    stream: TcpStream,
    handle: DriverHandle,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => {
                let shutdown = request == Request::Shutdown;
                let response = dispatch(request, &handle).await;
                write_line(&mut writer, &response).await?;
                if shutdown {
                    return Ok(());
                }
                continue;
            }
            Err(e) => Response::Error {
                message: format!("Invalid request: {}", e),
            },
        };
        write_line(&mut writer, &response).await?;
    }
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    writer
        .write_all(serde_json::to_string(response)?.as_bytes())
        .await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

pub async fn dispatch(request: Request, handle: &DriverHandle) -> Response {
    let result = match request {
        Request::GetState => return Response::State(Box::new(handle.view())),
        Request::StartPolling => handle
            .start_polling()
            .await
            .map(|()| Response::success("Polling started")),
        Request::StopPolling => handle
            .stop_polling()
            .await
            .map(|()| Response::success("Polling stopped")),
        Request::SubmitAnswer {
            question_index,
            answer_index,
        } => handle
            .submit_answer(question_index, answer_index)
            .await
            .map(|view| Response::State(Box::new(view))),
        Request::OpenViewer => handle
            .open_viewer()
            .await
            .map(|entries| Response::Entries { entries }),
        Request::DismissPrompt => handle.dismiss_prompt().await.map(|dismissed| {
            if dismissed {
                Response::success("Prompt dismissed")
            } else {
                Response::success("Nothing to dismiss")
            }
        }),
        Request::CloseViewer => handle.close_viewer().await.map(|acked| match acked {
            Some(id) => Response::success(format!("Read up to entry {}", id)),
            None => Response::success("Viewer closed"),
        }),
        Request::Restart => handle
            .restart()
            .await
            .map(|view| Response::State(Box::new(view))),
        Request::NamePet { name } => handle
            .name_pet(name)
            .await
            .map(|view| Response::State(Box::new(view))),
        Request::Shutdown => {
            info!("shutdown requested");
            handle.shutdown().await;
            Ok(Response::success("Shutting down"))
        }
    };
    result.unwrap_or_else(Response::from)
}
