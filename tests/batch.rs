#[cfg(test)]
mod batch {
    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use pretty_assertions::assert_eq;
    use volley::{Fields, Outcome, Request, ResponseBody};
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn blocking<F, T>(f: F) -> T
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let _ = env_logger::builder().is_test(true).try_init();
        tokio::task::spawn_blocking(f)
            .await
            .expect("Blocking task panicked")
    }

    async fn delayed(mock_server: &MockServer, route: &str, delay: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(route)
                    .set_delay(Duration::from_millis(delay)),
            )
            .mount(mock_server)
            .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_children_in_target_order() {
        let mock_server = MockServer::start().await;
        delayed(&mock_server, "/slow", 600).await;
        delayed(&mock_server, "/medium", 300).await;
        delayed(&mock_server, "/fast", 0).await;
        let endpoint = mock_server.uri();

        let (outcome, responses, completed, elapsed) = blocking(move || {
            let completed = Arc::new(Mutex::new(Vec::new()));
            let mut request = Request::new().unwrap();
            let log = completed.clone();
            request.on_complete(move |child, _, _| {
                log.lock()
                    .unwrap()
                    .push(child.response().as_raw().unwrap_or_default().to_string());
            });

            let targets: Vec<String> = ["/slow", "/medium", "/fast"]
                .iter()
                .map(|route| format!("{endpoint}{route}"))
                .collect();
            let start = Instant::now();
            let outcome = request.get(targets, ()).unwrap();
            let elapsed = start.elapsed();

            let responses: Vec<_> = request
                .children()
                .iter()
                .map(|child| child.response().clone())
                .collect();
            let completed = completed.lock().unwrap().clone();
            (outcome, responses, completed, elapsed)
        })
        .await;

        assert_eq!(outcome, Outcome::Batch);
        assert_eq!(
            responses,
            vec![
                ResponseBody::Raw("/slow".into()),
                ResponseBody::Raw("/medium".into()),
                ResponseBody::Raw("/fast".into()),
            ]
        );
        // callbacks fire in target order, not completion order
        assert_eq!(completed, vec!["/slow", "/medium", "/fast"]);
        // run concurrently, not one after another
        assert!(elapsed < Duration::from_millis(850), "took {elapsed:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_child_does_not_affect_others() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        delayed(&mock_server, "/ok", 0).await;
        let endpoint = mock_server.uri();
        let refused = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            format!("http://{}", listener.local_addr().unwrap())
        };

        let (codes, parent_error) = blocking(move || {
            let mut request = Request::new().unwrap();
            request
                .get(
                    vec![
                        format!("{endpoint}/ok"),
                        format!("{endpoint}/missing"),
                        refused,
                        "not a url".to_string(),
                    ],
                    (),
                )
                .unwrap();
            let codes: Vec<_> = request
                .children()
                .iter()
                .map(|child| (child.error(), child.error_code()))
                .collect();
            (codes, request.error())
        })
        .await;

        assert_eq!(codes, vec![(false, 0), (true, 404), (true, 7), (true, 3)]);
        assert!(!parent_error);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_post_batch_shares_configuration() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-token", "secret"))
            .and(header("user-agent", "batcher/1.0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&mock_server)
            .await;
        let endpoint = mock_server.uri();

        let statuses = blocking(move || {
            let mut request = Request::new().unwrap();
            request
                .set_header("X-Token", "secret")
                .set_user_agent("batcher/1.0")
                .set_context(String::from("shared"));
            request.on_before_send(|child, _, context| {
                assert!(child.is_batch_child());
                let context = context.and_then(|context| context.downcast_ref::<String>());
                assert_eq!(context.map(String::as_str), Some("shared"));
            });

            request
                .post(
                    vec![format!("{endpoint}/a"), format!("{endpoint}/b")],
                    Fields::new().text("k", "v"),
                )
                .unwrap();
            request
                .children()
                .iter()
                .map(Request::http_status_code)
                .collect::<Vec<_>>()
        })
        .await;

        assert_eq!(statuses, vec![200, 200]);
    }
}
