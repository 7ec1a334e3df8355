// ABOUTME: Varlink-style framing over any byte stream.
// ABOUTME: JSON request/reply messages, each terminated by a NUL byte.

use super::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};

/// One request/response exchange with the remote service.
#[async_trait]
pub trait Transport: Send {
    /// Send `method` with `parameters` and wait for its reply parameters.
    async fn call(&mut self, method: &str, parameters: Value) -> Result<Value>;

    /// Shut down the write side. The transport is not used afterwards.
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    method: &'a str,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Varlink framing over a split stream.
pub struct VarlinkStream<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
}

impl<S> VarlinkStream<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    pub fn new(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }
}

#[async_trait]
impl<S> Transport for VarlinkStream<S>
where
    S: AsyncRead + AsyncWrite + Send,
{
    async fn call(&mut self, method: &str, parameters: Value) -> Result<Value> {
        let mut frame = serde_json::to_vec(&Request { method, parameters })?;
        frame.push(0);
        self.writer.write_all(&frame).await?;
        self.writer.flush().await?;

        let mut buf = Vec::new();
        let read = self.reader.read_until(0, &mut buf).await?;
        if read == 0 || buf.last() != Some(&0) {
            return Err(Error::Closed);
        }
        buf.pop();

        let reply: Reply = serde_json::from_slice(&buf)?;
        match reply.error {
            Some(name) => Err(Error::Remote {
                detail: describe(&reply.parameters),
                name,
            }),
            None => Ok(reply.parameters),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Human-readable text for varlink error parameters.
fn describe(parameters: &Value) -> String {
    match parameters {
        Value::Null => String::new(),
        Value::Object(map) => {
            if let Some(Value::String(reason)) = map.get("reason") {
                return reason.clone();
            }
            let mut strings = map.values().filter_map(Value::as_str);
            match (strings.next(), strings.next()) {
                (Some(only), None) => only.to_string(),
                _ => parameters.to_string(),
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::DuplexStream;

    /// Read one NUL-terminated frame from the server end.
    async fn read_frame(server: &mut BufReader<DuplexStream>) -> Value {
        let mut buf = Vec::new();
        server.read_until(0, &mut buf).await.unwrap();
        buf.pop();
        serde_json::from_slice(&buf).unwrap()
    }

    async fn write_frame(server: &mut BufReader<DuplexStream>, value: Value) {
        let mut frame = serde_json::to_vec(&value).unwrap();
        frame.push(0);
        server.get_mut().write_all(&frame).await.unwrap();
    }

    #[tokio::test]
    async fn call_writes_request_and_returns_parameters() {
        let (client, server) = tokio::io::duplex(4096);
        let mut transport = VarlinkStream::new(client);
        let mut server = BufReader::new(server);

        let server_task = tokio::spawn(async move {
            let request = read_frame(&mut server).await;
            write_frame(&mut server, json!({"parameters": {"image": "sha256:abc"}})).await;
            request
        });

        let reply = transport
            .call("io.podman.TagImage", json!({"name": "abc", "tagged": "app:v1"}))
            .await
            .unwrap();

        assert_eq!(reply, json!({"image": "sha256:abc"}));
        let request = server_task.await.unwrap();
        assert_eq!(request["method"], "io.podman.TagImage");
        assert_eq!(request["parameters"]["tagged"], "app:v1");
    }

    #[tokio::test]
    async fn error_reply_becomes_remote_error() {
        let (client, server) = tokio::io::duplex(4096);
        let mut transport = VarlinkStream::new(client);
        let mut server = BufReader::new(server);

        tokio::spawn(async move {
            read_frame(&mut server).await;
            write_frame(
                &mut server,
                json!({"error": "io.podman.ContainerNotFound", "parameters": {"id": "web"}}),
            )
            .await;
        });

        let err = transport
            .call("io.podman.ContainerStateData", json!({"name": "web"}))
            .await
            .unwrap_err();

        assert_eq!(err.remote_name(), Some("ContainerNotFound"));
        assert!(err.to_string().contains("web"));
    }

    #[tokio::test]
    async fn peer_hangup_is_closed() {
        let (client, server) = tokio::io::duplex(4096);
        let mut transport = VarlinkStream::new(client);
        drop(server);

        let err = transport
            .call("io.podman.ListImages", json!({}))
            .await
            .unwrap_err();
        assert!(err.is_connectivity(), "got {err:?}");
    }

    #[tokio::test]
    async fn garbage_reply_is_protocol_error() {
        let (client, server) = tokio::io::duplex(4096);
        let mut transport = VarlinkStream::new(client);
        let mut server = BufReader::new(server);

        tokio::spawn(async move {
            read_frame(&mut server).await;
            server.get_mut().write_all(b"not json\0").await.unwrap();
        });

        let err = transport
            .call("io.podman.ListImages", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn describe_prefers_reason() {
        assert_eq!(describe(&json!({"reason": "boom", "id": "x"})), "boom");
        assert_eq!(describe(&json!({"name": "nginx"})), "nginx");
        assert_eq!(describe(&Value::Null), "");
    }
}
