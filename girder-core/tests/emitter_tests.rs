use girder_core::*;
use std::time::Duration;
use tokio::io::AsyncReadExt;

fn split(output: &[u8]) -> (String, Vec<u8>) {
    let end = output
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("complete head");
    (
        String::from_utf8_lossy(&output[..end + 4]).into_owned(),
        output[end + 4..].to_vec(),
    )
}

/// Chunk sizes and payload of a chunked body.
fn dechunk(mut body: &[u8]) -> (Vec<usize>, Vec<u8>) {
    let mut sizes = Vec::new();
    let mut data = Vec::new();
    loop {
        let line_end = body.windows(2).position(|w| w == b"\r\n").expect("chunk size line");
        let size = usize::from_str_radix(std::str::from_utf8(&body[..line_end]).unwrap(), 16).unwrap();
        body = &body[line_end + 2..];
        if size == 0 {
            return (sizes, data);
        }
        sizes.push(size);
        data.extend_from_slice(&body[..size]);
        body = &body[size + 2..];
    }
}

#[test]
fn test_selection_follows_body_variant() {
    let stack = EmitterStack::new();

    let full = HttpResponse::text("hi");
    assert!(stack.select(&full).can_emit(&full));
    assert!(SapiEmitter.can_emit(&full));
    assert!(!BufferedStreamEmitter::default().can_emit(&full));

    let streamed = HttpResponse::stream(ByteStream::from_chunks(vec!["a"]));
    assert!(BufferedStreamEmitter::default().can_emit(&streamed));
    assert!(stack.select(&streamed).can_emit(&streamed));
    assert!(!EventStreamEmitter.can_emit(&streamed));

    let (events, _sender) = EventStream::new();
    let events = HttpResponse::event_stream(events);
    assert!(EventStreamEmitter.can_emit(&events));
    assert!(stack.select(&events).can_emit(&events));
    assert!(!SapiEmitter.can_emit(&events));
}

#[tokio::test]
async fn test_configured_chunk_size_reaches_stream_emitter() {
    let router = Router::from_definitions(vec![RouteDefinition::get(
        "/export",
        |_req: HttpRequest| async {
            Ok::<_, Error>(HttpResponse::stream(ByteStream::from_chunks(vec![
                "id,name\n",
                "1,left\n",
                "2,right\n",
            ])))
        },
    )]);
    let settings = HttpSettings {
        stream_chunk_size: 10,
        ..HttpSettings::default()
    };
    let pipeline = HttpPipelineBuilder::from_settings(router, &settings).build().unwrap();

    let mut output = Vec::new();
    pipeline
        .serve(HttpRequest::new("GET".into(), "/export".into()), &mut output)
        .await
        .unwrap();

    let (head, body) = split(&output);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked"));
    assert!(head.contains(&format!("{}: ", LOG_TRACE_HEADER)));

    let (sizes, data) = dechunk(&body);
    assert_eq!(sizes, vec![10, 10, 3]);
    assert_eq!(data, b"id,name\n1,left\n2,right\n");
}

#[tokio::test]
async fn test_events_reach_the_client_as_they_are_sent() {
    let (events, sender) = EventStream::new();
    let (mut client, mut server) = tokio::io::duplex(4096);

    let emitter = tokio::spawn(async move {
        EventStreamEmitter
            .emit(HttpResponse::event_stream(events), &mut server)
            .await
    });

    sender
        .send(ServerSentEvent::with_event("greeting", "hello").id("1"))
        .await
        .unwrap();

    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&received).contains("data: hello\n\n") {
        let n = client.read(&mut buf).await.unwrap();
        assert!(n > 0, "stream closed before the first event");
        received.extend_from_slice(&buf[..n]);
    }
    let text = String::from_utf8_lossy(&received).into_owned();
    assert!(text.contains("Content-Type: text/event-stream"));
    assert!(text.contains("X-Accel-Buffering: no"));
    assert!(text.contains("event: greeting\n"));

    drop(sender);
    emitter.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_client_disconnect_ends_event_stream() {
    let (events, sender) = EventStream::new();
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);

    sender.send_message("nobody listening").await.unwrap();
    let result = EventStreamEmitter
        .emit(HttpResponse::event_stream(events), &mut server)
        .await;
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_ttl_closes_stream_and_releases_producer() {
    let (events, sender) = EventStream::new();
    let events = events.with_ttl(Duration::from_secs(5));

    let mut output = Vec::new();
    EventStreamEmitter
        .emit(HttpResponse::event_stream(events), &mut output)
        .await
        .unwrap();

    assert!(sender.is_closed());
    assert!(sender.send_message("late").await.is_err());
}

#[tokio::test]
async fn test_unbounded_stream_runs_until_producer_finishes() {
    let (events, sender) = EventStream::new();
    let producer = tokio::spawn(async move {
        for n in 0..3 {
            sender.send_message(n.to_string()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let mut output = Vec::new();
    EventStreamEmitter
        .emit(HttpResponse::event_stream(events), &mut output)
        .await
        .unwrap();
    producer.await.unwrap();

    let (_, body) = split(&output);
    let (sizes, data) = dechunk(&body);
    assert_eq!(sizes.len(), 3);
    assert_eq!(data, b"data: 0\n\ndata: 1\n\ndata: 2\n\n");
}

#[tokio::test]
async fn test_head_request_is_answered_without_a_body() {
    let router = Router::from_definitions(vec![RouteDefinition::get("/doc", |_req: HttpRequest| async {
        Ok::<_, Error>(HttpResponse::text("secret-body"))
    })]);
    let pipeline = HttpPipeline::builder(router).build().unwrap();

    let mut output = Vec::new();
    pipeline
        .serve(HttpRequest::new("HEAD".into(), "/doc".into()), &mut output)
        .await
        .unwrap();

    let (head, body) = split(&output);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("\r\nContent-Length: 11\r\n"));
    assert!(body.is_empty());
    assert!(!String::from_utf8_lossy(&output).contains("secret-body"));

    let mut output = Vec::new();
    pipeline
        .serve(HttpRequest::new("GET".into(), "/doc".into()), &mut output)
        .await
        .unwrap();
    let (_, body) = split(&output);
    assert_eq!(body, b"secret-body");
}

#[tokio::test(start_paused = true)]
async fn test_stalled_client_cannot_outlive_stream_ttl() {
    let router = Router::from_definitions(vec![RouteDefinition::get("/feed", |_req: HttpRequest| async {
        let (events, sender) = EventStream::new();
        tokio::spawn(async move {
            for _ in 0..100 {
                if sender.send_message("x".repeat(1024)).await.is_err() {
                    break;
                }
            }
        });
        Ok::<_, Error>(HttpResponse::event_stream(events.with_ttl(Duration::from_secs(5))))
    })]);
    let pipeline = HttpPipeline::builder(router).build().unwrap();

    // The client keeps the connection open but never reads from it.
    let (_client, mut server) = tokio::io::duplex(512);
    let result = tokio::time::timeout(
        Duration::from_secs(60),
        pipeline.serve(HttpRequest::new("GET".into(), "/feed".into()), &mut server),
    )
    .await
    .expect("emission held past the stream's time-to-live");

    match result {
        Err(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::TimedOut),
        other => panic!("expected a timed-out write, got {:?}", other),
    }
}

#[tokio::test]
async fn test_echoed_headers_cannot_inject_lines() {
    let router = Router::from_definitions(vec![RouteDefinition::get("/widgets", |_req: HttpRequest| async {
        Ok::<_, Error>(HttpResponse::text("ok"))
    })]);
    let pipeline = HttpPipeline::builder(router).build().unwrap();

    let mut output = Vec::new();
    pipeline
        .serve(
            HttpRequest::new("OPTIONS".into(), "/widgets".into())
                .with_header("Origin", "https://app.example\r\nSet-Cookie: session=stolen"),
            &mut output,
        )
        .await
        .unwrap();

    let (head, _) = split(&output);
    assert!(head.starts_with("HTTP/1.1 204 "));
    assert!(!head.contains("\r\nSet-Cookie"));
    assert!(head.contains("\r\nAccess-Control-Allow-Origin: https://app.exampleSet-Cookie: session=stolen\r\n"));
}
