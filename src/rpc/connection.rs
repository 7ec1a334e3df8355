// ABOUTME: Shared connection to the remote service with open/closed lifecycle.
// ABOUTME: Serializes concurrent calls over the single underlying transport.

use super::address::Address;
use super::error::{Error, Result};
use super::transport::{Transport, VarlinkStream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::{TcpStream, UnixStream};
use tokio::sync::Mutex;

/// A connection owned by one runtime instance.
///
/// Calls from concurrent tasks queue on an async mutex, so exactly one
/// request is on the wire at a time. After [`Connection::close`] every call
/// fails with [`Error::Closed`].
pub struct Connection {
    address: String,
    transport: Mutex<Option<Box<dyn Transport>>>,
}

impl Connection {
    /// Connect to the service. No retries; a failure is final.
    pub async fn open(address: &Address) -> Result<Self> {
        let connect_err = |source| Error::Connect {
            address: address.to_string(),
            source,
        };

        let transport: Box<dyn Transport> = match address {
            Address::Unix(path) => {
                let stream = UnixStream::connect(path).await.map_err(connect_err)?;
                Box::new(VarlinkStream::new(stream))
            }
            Address::Tcp { host, port } => {
                let stream = TcpStream::connect((host.as_str(), *port))
                    .await
                    .map_err(connect_err)?;
                Box::new(VarlinkStream::new(stream))
            }
        };

        tracing::debug!(%address, "connected to remote service");
        Ok(Self::with_transport(address.to_string(), transport))
    }

    /// Wrap an already established transport.
    pub fn with_transport(address: impl Into<String>, transport: Box<dyn Transport>) -> Self {
        Self {
            address: address.into(),
            transport: Mutex::new(Some(transport)),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Invoke `method` and decode its reply parameters.
    pub async fn call<P, R>(&self, method: &str, parameters: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let parameters = serde_json::to_value(parameters)?;
        let reply = {
            let mut guard = self.transport.lock().await;
            let transport = guard.as_mut().ok_or(Error::Closed)?;
            tracing::trace!(method, "rpc call");
            transport.call(method, parameters).await?
        };
        Ok(serde_json::from_value(reply)?)
    }

    /// Close the connection. Closing an already closed connection does nothing.
    pub async fn close(&self) {
        let taken = self.transport.lock().await.take();
        if let Some(mut transport) = taken {
            if let Err(e) = transport.close().await {
                tracing::warn!(address = %self.address, "error while closing connection: {}", e);
            }
            tracing::debug!(address = %self.address, "connection closed");
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.transport.lock().await.is_none()
    }
}
