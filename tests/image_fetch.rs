use notion_md_sync::image::{AssetDir, FetchError, HttpImageFetcher, ImageFetcher};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpImageFetcher {
    HttpImageFetcher::new(reqwest::Client::new())
}

#[tokio::test]
async fn streams_body_to_destination() {
    let server = MockServer::start().await;
    let body: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    Mock::given(method("GET"))
        .and(path("/img/photo.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "image/png"))
        .mount(&server)
        .await;

    let td = tempdir().unwrap();
    let dest = td.path().join("photo.png");
    let url = format!("{}/img/photo.png?sig=1", server.uri());
    fetcher().fetch(&url, &dest).await.expect("fetch ok");

    assert_eq!(std::fs::read(&dest).unwrap(), body);
}

#[tokio::test]
async fn http_status_is_reported_and_nothing_is_left_behind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let td = tempdir().unwrap();
    let dest = td.path().join("missing.jpg");
    let err = fetcher()
        .fetch(&format!("{}/missing.jpg", server.uri()), &dest)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::HttpStatus { code: 404 }));
    assert!(!dest.exists());
}

#[tokio::test]
async fn transport_failure_is_distinct() {
    let td = tempdir().unwrap();
    let dest = td.path().join("x.jpg");
    let err = fetcher()
        .fetch("http://127.0.0.1:1/x.jpg", &dest)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }), "{err:?}");
    assert!(!dest.exists());
}

/// Serves one response that promises more bytes than it sends, then hangs up.
async fn truncated_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let head = concat!(
            "HTTP/1.1 200 OK\r\n",
            "Content-Type: image/png\r\n",
            "Content-Length: 100000\r\n\r\n",
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&[7u8; 5000]).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{}/img/partial.png", addr)
}

#[tokio::test]
async fn interrupted_body_removes_partial_file() {
    let url = truncated_server().await;
    let td = tempdir().unwrap();
    let dest = td.path().join("partial.png");

    let err = fetcher().fetch(&url, &dest).await.unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }), "{err:?}");
    assert!(!dest.exists());
}

#[tokio::test]
async fn write_failure_is_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"data".to_vec()))
        .mount(&server)
        .await;

    let td = tempdir().unwrap();
    let dest = td.path().join("no-such-dir").join("x.jpg");
    let err = fetcher()
        .fetch(&format!("{}/x.jpg", server.uri()), &dest)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Write { .. }), "{err:?}");
}

#[tokio::test]
async fn materialize_names_file_after_stem_and_extension() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/covers/Hero.JPEG"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
        .mount(&server)
        .await;

    let td = tempdir().unwrap();
    let assets = AssetDir::for_slug(td.path(), "/images/posts", "my-post");
    assets.ensure().await.unwrap();

    let url = format!("{}/covers/Hero.JPEG?X-Amz-Expires=3600", server.uri());
    let public = assets.materialize(&fetcher(), &url, "cover").await.unwrap();

    assert_eq!(public, "/images/posts/my-post/cover.JPEG");
    assert_eq!(
        std::fs::read(td.path().join("my-post/cover.JPEG")).unwrap(),
        b"jpeg"
    );
}
