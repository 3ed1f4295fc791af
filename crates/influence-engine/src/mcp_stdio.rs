use anyhow::Result;
use tokio::io::{stdin, stdout, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::engine::InfluenceEngine;
use crate::mcp::McpServer;
use crate::mcp_types::{McpError, McpRequest, McpResponse, PARSE_ERROR};

/// Serve JSON-RPC requests line by line on stdin/stdout until stdin closes.
pub async fn run_mcp_stdio(engine: InfluenceEngine) -> Result<()> {
    info!("mcp server listening on stdio");
    let lines = BufReader::new(stdin()).lines();
    serve(McpServer::new(engine), lines, stdout()).await
}

async fn serve<R, W>(server: McpServer, mut lines: tokio::io::Lines<R>, mut out: W) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<McpRequest>(&line) {
            Ok(request) => server.handle(request).await,
            Err(e) => {
                warn!(error = %e, "unparsable request");
                Some(McpResponse::failure(
                    None,
                    McpError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ))
            }
        };

        if let Some(response) = response {
            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            out.write_all(&payload).await?;
            out.flush().await?;
        }
    }

    info!("stdin closed, mcp server stopping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[tokio::test]
    async fn answers_each_request_line() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add_user","arguments":{"id":"alice"}}}"#,
            "\n",
        );
        let lines = BufReader::new(input.as_bytes()).lines();
        let mut out = Vec::new();
        serve(McpServer::new(InfluenceEngine::default()), lines, &mut out)
            .await
            .unwrap();

        let responses: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "influence-mcp");
        assert_eq!(responses[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[2]["id"], 2);
        assert_eq!(responses[2]["result"]["isError"], false);
    }
}
