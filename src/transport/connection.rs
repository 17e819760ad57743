use hyper::body::{Bytes, Incoming};
use hyper::client::conn::{http1, http2};
use hyper::{Request, Response};
use http_body_util::Empty;
use hyper_util::rt::{TokioExecutor, TokioIo};
use rustls::pki_types::{CertificateDer, ServerName};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_rustls::TlsConnector;
use url::Url;

use super::{TransportError, hostname};
use crate::tls::ALPN_H2;

pub(crate) enum Sender {
    Http1(http1::SendRequest<Empty<Bytes>>),
    Http2(http2::SendRequest<Empty<Bytes>>),
}

/// Driver task of one hyper connection, aborted when dropped.
pub(crate) struct ConnectionTask(JoinHandle<()>);

impl ConnectionTask {
    fn spawn<F>(conn: F) -> Self
    where
        F: Future<Output = Result<(), hyper::Error>> + Send + 'static,
    {
        Self(tokio::spawn(async move {
            if let Err(e) = conn.await {
                log::debug!("Connection closed with error: {}", e);
            }
        }))
    }
}

impl Drop for ConnectionTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// A single-use connection to the host of a URL.
pub(crate) struct Connection {
    sender: Sender,
    peer_certificates: Option<Vec<CertificateDer<'static>>>,
    task: ConnectionTask,
}

impl Connection {
    pub async fn open(url: &Url, tls: TlsConnector) -> Result<Self, TransportError> {
        let tls_required = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(TransportError::UnsupportedScheme(other.to_string())),
        };
        let host = hostname(url).ok_or(TransportError::MissingHost)?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| TransportError::UnsupportedScheme(url.scheme().to_string()))?;

        let tcp = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(TransportError::Connect)?;
        let _ = tcp.set_nodelay(true);

        if !tls_required {
            return Self::handshake(tcp, false, None).await;
        }

        let server_name = ServerName::try_from(host.clone())
            .map_err(|_| TransportError::ServerName(host))?;
        let stream = tls
            .connect(server_name, tcp)
            .await
            .map_err(TransportError::Tls)?;

        let (_, session) = stream.get_ref();
        let http2 = session.alpn_protocol() == Some(ALPN_H2);
        let peer_certificates = session.peer_certificates().map(|certs| certs.to_vec());

        Self::handshake(stream, http2, peer_certificates).await
    }

    async fn handshake<T>(
        io: T,
        http2: bool,
        peer_certificates: Option<Vec<CertificateDer<'static>>>,
    ) -> Result<Self, TransportError>
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let io = TokioIo::new(io);

        let (sender, task) = if http2 {
            let (sender, conn) =
                http2::handshake::<_, _, Empty<Bytes>>(TokioExecutor::new(), io).await?;
            (Sender::Http2(sender), ConnectionTask::spawn(conn))
        } else {
            let (sender, conn) = http1::handshake::<_, Empty<Bytes>>(io).await?;
            (Sender::Http1(sender), ConnectionTask::spawn(conn))
        };

        Ok(Self {
            sender,
            peer_certificates,
            task,
        })
    }

    pub fn is_http2(&self) -> bool {
        matches!(self.sender, Sender::Http2(_))
    }

    pub async fn send(
        mut self,
        request: Request<Empty<Bytes>>,
    ) -> Result<Sent, TransportError> {
        let response = match &mut self.sender {
            Sender::Http1(sender) => {
                sender.ready().await?;
                sender.send_request(request).await?
            }
            Sender::Http2(sender) => {
                sender.ready().await?;
                sender.send_request(request).await?
            }
        };

        Ok(Sent {
            response,
            peer_certificates: self.peer_certificates,
            connection: (self.sender, self.task),
        })
    }
}

/// A response together with the connection it arrived on. The connection is
/// kept open until the response body has been consumed or dropped.
pub(crate) struct Sent {
    pub response: Response<Incoming>,
    pub peer_certificates: Option<Vec<CertificateDer<'static>>>,
    pub connection: (Sender, ConnectionTask),
}
