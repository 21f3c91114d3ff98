//! Integration tests for the gemini_chat library.
//!
//! The `local_*` tests run the full stack against a one-shot HTTP server on
//! the loopback interface.  The `live_*` tests require `API_KEY` in the
//! environment and skip themselves otherwise.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use gemini_chat::chat::{ChatConfig, ChatController, SubmitOutcome, render_page};
    use gemini_chat::{
        Content, Gemini, GenerateContentRequest, KnownModel, Model, ModelService, Role, Sender,
    };

    /// Serve one request with `response` and return the raw request text.
    async fn serve_once(response: String) -> (SocketAddr, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if let Some(end) = find(&request, b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = head
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (addr, handle)
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn sse_response(events: &[&str]) -> String {
        let body: String = events
            .iter()
            .map(|event| format!("data: {event}\r\n\r\n"))
            .collect();
        format!(
            "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n{body}"
        )
    }

    fn local_config(addr: SocketAddr) -> ChatConfig {
        ChatConfig::new()
            .with_api_key("test-key")
            .with_base_url(Some(format!("http://{addr}/v1beta")))
    }

    #[tokio::test]
    async fn local_streamed_reply() {
        let (addr, request) = serve_once(sse_response(&[
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"}]}}]}"#,
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":" world"}]},"finishReason":"STOP"}]}"#,
        ]))
        .await;

        let mut controller = ChatController::initialize(&local_config(addr));
        assert!(controller.has_session());

        let outcome = controller.submit_text("hi there", &mut ()).await;
        let SubmitOutcome::Completed { reply } = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(controller.transcript().get(reply).unwrap().text(), "Hello world");
        assert_eq!(controller.transcript().len(), 3);

        let history = controller.session().unwrap().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text(), "Hello world");

        let request = request.await.unwrap();
        let lowered = request.to_lowercase();
        assert!(
            request.starts_with(
                "POST /v1beta/models/gemini-2.5-flash-preview-04-17:streamGenerateContent?alt=sse "
            ),
            "{request}"
        );
        assert!(lowered.contains("x-goog-api-key: test-key"), "{request}");
        assert!(request.contains(r#""systemInstruction""#), "{request}");
        assert!(request.contains("hi there"), "{request}");
    }

    #[tokio::test]
    async fn local_error_response_fails_the_submission() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let (addr, _request) = serve_once(format!(
            "HTTP/1.1 400 Bad Request\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        ))
        .await;

        let mut controller = ChatController::initialize(&local_config(addr));
        let outcome = controller.submit_text("hi", &mut ()).await;
        let SubmitOutcome::Failed { reply, error } = outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(error.is_bad_request(), "{error:?}");
        assert_eq!(controller.transcript().get(reply).unwrap().text(), "");
        assert_eq!(controller.transcript().count(Sender::Error), 1);
        assert!(controller.last_error().unwrap().contains("API key not valid"));
        assert!(!controller.is_busy());
        assert!(controller.session().unwrap().history().is_empty());

        let page = render_page(&controller.view_state());
        assert!(page.contains("role=\"alert\""));
    }

    #[tokio::test]
    async fn live_streamed_chat() {
        let Ok(api_key) = std::env::var("API_KEY") else {
            eprintln!("Skipping test: API_KEY not set");
            return;
        };

        let config = ChatConfig::new()
            .with_api_key(api_key)
            .with_model(Model::Known(KnownModel::Gemini20Flash));
        let mut controller = ChatController::initialize(&config);
        assert!(controller.has_session());

        let outcome = controller
            .submit_text("Reply with the single word: pong", &mut ())
            .await;
        assert!(outcome.is_completed(), "{outcome:?}");
        let reply = controller.transcript().last().unwrap();
        assert_eq!(reply.sender(), Sender::Ai);
        assert!(!reply.text().is_empty());
    }

    #[tokio::test]
    async fn live_non_streaming_request() {
        let Ok(api_key) = std::env::var("API_KEY") else {
            eprintln!("Skipping test: API_KEY not set");
            return;
        };

        let client = Gemini::new(Some(api_key)).expect("Failed to create client");
        let request = GenerateContentRequest::new(vec![Content::new_with_text(
            "Say 'test passed'",
            Role::User,
        )]);
        let response = client
            .send(&Model::Known(KnownModel::Gemini20Flash), &request)
            .await;
        assert!(response.is_ok(), "Request should succeed with valid API key");

        let session = client.create_session(&Model::Known(KnownModel::Gemini20Flash), "Be brief");
        assert!(session.is_ok());
    }
}
