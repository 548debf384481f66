//! Integration tests for common Tether workflows.
//!
//! Each test drives a full lifespan and request cycle the way a host would.

use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether::prelude::*;
use tether_testing::*;
use tokio_test::assert_ok;

fn division_by_zero() -> Fault {
    Fault::new("ZeroDivisionError", "division by zero")
}

// =============================================================================
// Lifespan
// =============================================================================

#[tokio::test]
async fn test_lifespan_startup_fail() {
    let mut app = App::new();
    app.on_startup(hook_blocking(|_state: &mut State| Err(division_by_zero())));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 500);
    assert_body(&response, "ZeroDivisionError: division by zero");
    assert_header(&response, "content-length", "35");
}

#[tokio::test]
async fn test_lifespan_shutdown_fail() {
    let mut app = App::new();
    app.on_shutdown(hook_blocking(|_state: &mut State| Err(division_by_zero())));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 500);
    assert_body(&response, "ZeroDivisionError: division by zero");
}

#[tokio::test]
async fn test_lifespan_startup_state_reaches_handlers() {
    let mut app = App::new();
    app.on_startup(hook_blocking(|state: &mut State| {
        state.insert("msg", "HI!".to_string());
        Ok(())
    }))
    .get(
        "/",
        blocking(|req: &mut Request| Ok(req.state.get::<String>("msg").cloned())),
    );

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_body(&response, "HI!");
}

#[tokio::test]
async fn test_lifespan_shutdown_sees_startup_state() {
    let msgs = Arc::new(Mutex::new(vec!["HI!".to_string()]));

    let mut app = App::new();
    app.on_startup(hook_blocking({
        let msgs = Arc::clone(&msgs);
        move |state: &mut State| {
            state.insert_arc("msgs", Arc::clone(&msgs));
            Ok(())
        }
    }))
    .on_shutdown(hook_blocking(|state: &mut State| {
        if let Some(msgs) = state.get_arc::<Mutex<Vec<String>>>("msgs") {
            msgs.lock().unwrap().push("BYE!".to_string());
        }
        Ok(())
    }));

    request(app, TestRequest::get("/")).await.unwrap();
    assert_eq!(msgs.lock().unwrap().last().map(String::as_str), Some("BYE!"));
}

#[tokio::test]
async fn test_async_startup_hook() {
    let mut app = App::new();
    app.on_startup(hook_fn(|state: &mut State| {
        Box::pin(async move {
            tokio::task::yield_now().await;
            state.insert("ready", true);
            Ok::<_, Fault>(())
        })
    }))
    .get(
        "/",
        blocking(|req: &mut Request| {
            Ok(match req.state.get::<bool>("ready") {
                Some(true) => "ready",
                _ => "not ready",
            })
        }),
    );

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_body(&response, "ready");
}

#[tokio::test]
async fn test_session_shutdown_reply() {
    let client = TestClient::start(App::new()).await.unwrap();
    assert!(client.startup_failure().is_none());
    assert!(client.app().phase().is_serving());

    let reply = client.shutdown().await.unwrap();
    assert_eq!(reply, tether::LifespanReply::ShutdownComplete);
}

// =============================================================================
// Status handling
// =============================================================================

#[tokio::test]
async fn test_204() {
    let mut app = App::new();
    app.get("/", blocking(|_req: &mut Request| Ok(())));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 204);
    assert_body(&response, "");
}

#[tokio::test]
async fn test_404() {
    let response = request(App::new(), TestRequest::get("/")).await.unwrap();
    assert_status(&response, 404);
    assert_body(&response, "Not Found");
}

#[tokio::test]
async fn test_405() {
    let mut app = App::new();
    app.route("/", &["GET", "POST"], blocking(|_req: &mut Request| Ok(())));

    let response = request(app, TestRequest::new("PUT", "/")).await.unwrap();
    assert_status(&response, 405);
    assert_header(&response, "allow", "GET, POST");
}

#[tokio::test]
async fn test_413() {
    let app = App::new();
    let body = vec![b' '; app.max_body_size() + 1];

    let response = request(app, TestRequest::post("/").body(body)).await.unwrap();
    assert_status(&response, 413);
}

#[tokio::test]
async fn test_413_across_chunks() {
    let mut app = App::new();
    app.set_max_body_size(8);

    let response = request(app, TestRequest::post("/").body("0123456789").chunked(3))
        .await
        .unwrap();
    assert_status(&response, 413);
    assert_body(&response, "Payload Too Large");
}

#[tokio::test]
async fn test_body_at_limit_accepted() {
    let mut app = App::new();
    app.set_max_body_size(8)
        .post("/", blocking(|req: &mut Request| Ok(req.body.clone())));

    let response = assert_ok!(
        request(app, TestRequest::post("/").body("01234567").chunked(3)).await
    );
    assert_status(&response, 200);
    assert_body(&response, "01234567");
}

#[tokio::test]
async fn test_status_reply() {
    let mut app = App::new();
    app.get("/teapot", blocking(|_req: &mut Request| Ok(418u16)));

    let response = request(app, TestRequest::get("/teapot")).await.unwrap();
    assert_status(&response, 418);
    assert_body(&response, "I'm a teapot");
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_methods() {
    let methods = ["GET", "HEAD", "POST", "PUT", "DELETE", "OPTIONS"];

    let mut app = App::new();
    app.route(
        "/",
        &methods,
        blocking(|req: &mut Request| Ok(req.method.clone())),
    );
    let client = TestClient::start(app).await.unwrap();

    for method in methods {
        let response = client.send(TestRequest::new(method, "/")).await.unwrap();
        assert_body(&response, method);
    }
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_path_parameters() {
    let mut app = App::new();
    app.get(
        r"/hello/(?P<name>\w+)",
        blocking(|req: &mut Request| {
            Ok(format!("Hello, {}!", req.param("name").unwrap_or_default()))
        }),
    );

    let response = request(app, TestRequest::get("/hello/john")).await.unwrap();
    assert_status(&response, 200);
    assert_body(&response, "Hello, john!");
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let mut app = App::new();
    app.get(r"/items/(?P<id>\d+)", blocking(|_req: &mut Request| Ok("by id")))
        .get(r"/items/(?P<slug>\w+)", blocking(|_req: &mut Request| Ok("by slug")));
    let client = TestClient::start(app).await.unwrap();

    assert_body(&client.get("/items/42").await.unwrap(), "by id");
    assert_body(&client.get("/items/latest").await.unwrap(), "by slug");
    assert_status(&client.get("/items/").await.unwrap(), 404);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_mounted_app() {
    let mut api = App::new();
    api.get("/users", blocking(|_req: &mut Request| Ok("users")))
        .before(blocking(|req: &mut Request| {
            req.headers.insert("x-api", "1");
            Ok(())
        }))
        .after(after_blocking(|req: &mut Request, res: &mut Response| {
            if let Some(value) = req.header("x-api") {
                res.headers.insert("x-api", value.to_string());
            }
            Ok(())
        }));

    let mut app = App::new();
    app.mount(api, "/api/v1");
    let client = TestClient::start(app).await.unwrap();

    let response = client.get("/api/v1/users").await.unwrap();
    assert_body(&response, "users");
    assert_header(&response, "x-api", "1");
    assert_status(&client.get("/users").await.unwrap(), 404);
    client.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_route_fails_startup() {
    let mut app = App::new();
    app.get("/broken/(", blocking(|_req: &mut Request| Ok(())));

    let client = TestClient::start(app).await.unwrap();
    let message = client.startup_failure().unwrap_or_default().to_string();
    assert!(message.starts_with("InvalidRoute"), "{}", message);

    let response = client.get("/").await.unwrap();
    assert_status(&response, 500);
}

// =============================================================================
// Request decoding
// =============================================================================

#[tokio::test]
async fn test_query_args() {
    let seen = Arc::new(Mutex::new(MultiMap::new()));

    let mut app = App::new();
    app.get("/", blocking({
        let seen = Arc::clone(&seen);
        move |req: &mut Request| {
            seen.lock().unwrap().extend_from(&req.args);
            Ok(())
        }
    }));

    request(app, TestRequest::get("/").query("tag=music&tag=rock&type=book"))
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.get_all("tag"), ["music", "rock"]);
    assert_eq!(seen.get_all("type"), ["book"]);
    assert_eq!(seen.len(), 2);
}

#[tokio::test]
async fn test_headers() {
    let mut app = App::new();
    app.get(
        "/",
        blocking(|req: &mut Request| Ok(req.header("from").unwrap_or_default().to_string())),
    );

    let response = request(app, TestRequest::get("/").header("from", "test@example.com"))
        .await
        .unwrap();
    assert_body(&response, "test@example.com");
}

#[tokio::test]
async fn test_cookie() {
    let mut app = App::new();
    app.get(
        "/",
        blocking(|req: &mut Request| {
            let lines: Vec<String> = req
                .cookies
                .iter()
                .map(|(name, value)| format!("Cookie: {}={}", name, value))
                .collect();
            Ok(lines.join("\r\n"))
        }),
    );

    let response = request(app, TestRequest::get("/").header("cookie", "id=1;name=john"))
        .await
        .unwrap();
    assert_body(&response, "Cookie: id=1\r\nCookie: name=john");
}

#[tokio::test]
async fn test_set_cookie() {
    let mut app = App::new();
    app.get(
        "/",
        blocking(|_req: &mut Request| {
            Ok(Response::no_content()
                .with_cookie(Cookie::new("id", "2"))
                .with_cookie(Cookie::new("name", "jane")))
        }),
    );

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 204);
    assert_eq!(response.header_all("set-cookie"), ["id=2", "name=jane"]);
}

#[tokio::test]
async fn test_bad_json() {
    let response = request(
        App::new(),
        TestRequest::post("/")
            .header("content-type", "application/json")
            .body(r#"{"some": 1"#),
    )
    .await
    .unwrap();
    assert_status(&response, 400);
}

#[tokio::test]
async fn test_good_json() {
    let mut app = App::new();
    app.post(
        "/",
        blocking(|req: &mut Request| Ok(req.json.as_ref().map(|v| v["some"].to_string()))),
    );

    let response = request(app, TestRequest::post("/").json(&json!({"some": 1})).unwrap())
        .await
        .unwrap();
    assert_body(&response, "1");
}

#[tokio::test]
async fn test_json_response() {
    let mut app = App::new();
    app.get("/", blocking(|_req: &mut Request| Ok(json!({"hello": "world"}))));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 200);
    assert_header(&response, "content-type", "application/json");
    assert_body(&response, r#"{"hello": "world"}"#);
    assert_json(&response, &json!({"hello": "world"}));
}

#[tokio::test]
async fn test_form() {
    let mut app = App::new();
    app.post(
        "/",
        blocking(|req: &mut Request| {
            Ok(format!(
                "{} is {}",
                req.form.get("name").unwrap_or_default(),
                req.form.get("age").unwrap_or_default()
            ))
        }),
    );

    let response = request(app, TestRequest::post("/").form("name=john&age=27"))
        .await
        .unwrap();
    assert_body(&response, "john is 27");
}

#[tokio::test]
async fn test_chunked_body_is_reassembled() {
    let mut app = App::new();
    app.post("/echo", blocking(|req: &mut Request| Ok(req.body.clone())));

    let response = request(app, TestRequest::post("/echo").body("hello, world").chunked(4))
        .await
        .unwrap();
    assert_body(&response, "hello, world");
}

// =============================================================================
// Middleware
// =============================================================================

#[tokio::test]
async fn test_early_response() {
    let mut app = App::new();
    app.before(blocking(|_req: &mut Request| Ok("Hi! I'm early!")))
        .get("/", blocking(|_req: &mut Request| Ok("Maybe?")));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 200);
    assert_body(&response, "Hi! I'm early!");
}

#[tokio::test]
async fn test_late_early_response() {
    let mut app = App::new();
    app.after(after_blocking(|_req: &mut Request, res: &mut Response| {
        res.status = 200;
        res.body = b"Am I early?".to_vec();
        Ok(())
    }));

    let response = request(app, TestRequest::post("/")).await.unwrap();
    assert_status(&response, 200);
    assert_body(&response, "Am I early?");
    assert_header(&response, "content-length", "11");
}

#[tokio::test]
async fn test_async_middleware_chain() {
    let mut app = App::new();
    app.before(from_fn(|req: &mut Request| {
        Box::pin(async move {
            req.headers.insert("x-trace", "before");
            Ok::<_, Fault>(())
        })
    }))
    .get(
        "/",
        from_fn(|req: &mut Request| {
            Box::pin(async move { Ok(req.header("x-trace").unwrap_or_default().to_string()) })
        }),
    )
    .after(after_fn(|_req: &mut Request, res: &mut Response| {
        Box::pin(async move {
            res.headers.insert("x-trace", "after");
            Ok::<_, Fault>(())
        })
    }));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_body(&response, "before");
    assert_header(&response, "x-trace", "after");
}

#[tokio::test]
async fn test_failing_after_middleware_becomes_500() {
    let mut app = App::new();
    app.get("/", blocking(|_req: &mut Request| Ok("fine")))
        .after(after_blocking(|_req: &mut Request, _res: &mut Response| {
            Err::<(), _>(division_by_zero())
        }));

    let response = request(app, TestRequest::get("/")).await.unwrap();
    assert_status(&response, 500);
    assert_body(&response, "Internal Server Error");
}

// =============================================================================
// Blocking callables
// =============================================================================

#[tokio::test(flavor = "current_thread")]
async fn test_blocking_handler_does_not_stall_other_requests() {
    let mut app = App::new();
    app.get(
        "/slow",
        blocking(|_req: &mut Request| {
            std::thread::sleep(Duration::from_millis(300));
            Ok("slow")
        }),
    )
    .get("/fast", blocking(|_req: &mut Request| Ok("fast")));
    let client = assert_ok!(TestClient::start(app).await);

    let finished = Mutex::new(Vec::new());
    let track = |path: &'static str| {
        let client = &client;
        let finished = &finished;
        async move {
            let response = assert_ok!(client.get(path).await);
            finished.lock().unwrap().push(path);
            response
        }
    };

    let (slow, fast) = tokio::join!(track("/slow"), track("/fast"));
    assert_body(&slow, "slow");
    assert_body(&fast, "fast");
    assert_eq!(*finished.lock().unwrap(), ["/fast", "/slow"]);

    assert_ok!(client.shutdown().await);
}
