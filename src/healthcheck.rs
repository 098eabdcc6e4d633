//! Container healthcheck: probe the running HTTP responder

use crate::error::{AppError, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use url::Url;

/// Build the URL the healthcheck probes on the responder bound to `listen`.
/// A wildcard bind is reached through loopback.
pub fn local_url(listen: SocketAddr, path: &str) -> Result<Url> {
    let ip = match listen.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    let base = Url::parse(&format!("http://{}", SocketAddr::new(ip, listen.port())))?;
    Ok(base.join(path)?)
}

/// GET `url` and succeed only on a 2xx response
pub async fn check(url: &Url, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(format!("{}/{} healthcheck", crate::PKG_NAME, crate::VERSION))
        .build()
        .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if status.is_success() {
        Ok(())
    } else {
        Err(AppError::http_request(format!("{} returned HTTP {}", url, status)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_local_url() {
        assert_eq!(local_url(addr("0.0.0.0:9798"), "/").unwrap().as_str(), "http://127.0.0.1:9798/");
        assert_eq!(local_url(addr("0.0.0.0:9100"), "/metrics").unwrap().as_str(), "http://127.0.0.1:9100/metrics");
    }

    #[test]
    fn test_local_url_uses_specific_listen_address() {
        assert_eq!(local_url(addr("10.1.2.3:9798"), "/").unwrap().as_str(), "http://10.1.2.3:9798/");
        assert_eq!(local_url(addr("[::]:9798"), "/").unwrap().as_str(), "http://[::1]:9798/");
        assert_eq!(local_url(addr("[fd00::7]:9798"), "/").unwrap().as_str(), "http://[fd00::7]:9798/");
    }

    #[tokio::test]
    async fn test_healthy_responder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Welcome</h1>"))
            .expect(1)
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        assert!(check(&url, Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let error = check(&url, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(error, AppError::HttpRequest(_)));
        assert!(error.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_unreachable_responder_fails() {
        // Bind then drop to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = local_url(SocketAddr::from(([127, 0, 0, 1], port)), "/").unwrap();
        let error = check(&url, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(error, AppError::Network(_) | AppError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_slow_responder_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let error = check(&url, Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(error, AppError::Timeout(_)));
    }
}
