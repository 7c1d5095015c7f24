//! HttpOracle against a local stub chat-completions server.

use std::fs;
use std::sync::Arc;

use locate_agent::config::{AgentConfig, OracleSection};
use locate_agent::ladder::build_ladder;
use locate_agent::HttpOracle;
use resolution::error::OracleError;
use resolution::{JudgmentOracle, JudgmentVerdict, ResolutionOutcome, Resolver, SearchItem};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Canned HTTP reply.
struct Reply {
    status: &'static str,
    body: String,
}

fn completion(content: &str) -> Reply {
    Reply {
        status: "200 OK",
        body: json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
            .to_string(),
    }
}

fn verdict_reply(verdict: &JudgmentVerdict) -> Reply {
    completion(&serde_json::to_string(verdict).unwrap())
}

/// Serve `replies` in order, one connection each; returns the request bodies.
async fn stub_server(replies: Vec<Reply>) -> (String, JoinHandle<Vec<Value>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut bodies = Vec::new();
        for reply in replies {
            let (mut socket, _) = listener.accept().await.unwrap();
            let body = read_request_body(&mut socket).await;
            bodies.push(serde_json::from_slice(&body).unwrap());

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        bodies
    });

    (url, handle)
}

async fn read_request_body(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a full request");
        buf.extend_from_slice(&chunk[..n]);

        let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let content_length = headers
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        let body_start = header_end + 4;
        if buf.len() >= body_start + content_length {
            return buf[body_start..body_start + content_length].to_vec();
        }
    }
}

fn oracle_for(url: &str) -> HttpOracle {
    HttpOracle::new(&OracleSection {
        url: url.to_string(),
        model: "judge-model".into(),
        api_key: Some("sk-local".into()),
        timeout_secs: 10,
        temperature: 0.0,
    })
    .unwrap()
}

#[tokio::test]
async fn test_judge_round_trip() {
    let (url, server) =
        stub_server(vec![verdict_reply(&JudgmentVerdict::refine("project.?2"))]).await;
    let oracle = oracle_for(&url);

    let verdict = oracle
        .judge(
            "open the project-2 report",
            &[SearchItem::new("Games", "/d/Games")],
        )
        .await
        .unwrap();
    assert_eq!(verdict, JudgmentVerdict::refine("project.?2"));

    let bodies = server.await.unwrap();
    assert_eq!(bodies[0]["model"], "judge-model");
    assert_eq!(bodies[0]["response_format"]["type"], "json_schema");
    let system = bodies[0]["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("open the project-2 report"));
}

#[tokio::test]
async fn test_server_error_is_unreachable() {
    let (url, server) = stub_server(vec![Reply {
        status: "503 Service Unavailable",
        body: r#"{"error":"loading model"}"#.into(),
    }])
    .await;

    let err = oracle_for(&url).judge("x", &[]).await.unwrap_err();
    match err {
        OracleError::Unreachable(msg) => assert!(msg.contains("503")),
        other => panic!("expected Unreachable, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn test_prose_reply_is_malformed() {
    let (url, server) = stub_server(vec![completion("I think it is the report.")]).await;
    let err = oracle_for(&url).judge("x", &[]).await.unwrap_err();
    assert!(matches!(err, OracleError::Malformed(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_refused_is_unreachable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1", listener.local_addr().unwrap());
    drop(listener);

    let err = oracle_for(&url).judge("x", &[]).await.unwrap_err();
    assert!(matches!(err, OracleError::Unreachable(_)));
}

#[tokio::test]
async fn test_refine_task_strips_quotes() {
    let (url, server) =
        stub_server(vec![completion("\"Find the WeChat executable.\"\n")]).await;
    let refined = oracle_for(&url)
        .refine_task("um open wechat")
        .await
        .unwrap();
    assert_eq!(refined, "Find the WeChat executable.");

    let bodies = server.await.unwrap();
    assert!(bodies[0].get("response_format").is_none());
    assert_eq!(bodies[0]["messages"][1]["content"], "um open wechat");
}

fn encode_layout(names: &[&str]) -> Vec<u8> {
    let mut blob = vec![0u8; 0x18];
    blob.extend_from_slice(&(names.len() as u32).to_le_bytes());
    for name in names {
        let units: Vec<u16> = name.encode_utf16().collect();
        let mut header = [0u8; 12];
        header[4..8].copy_from_slice(&(units.len() as u32 + 4).to_le_bytes());
        blob.extend_from_slice(&header);
        for u in units {
            blob.extend_from_slice(&u.to_le_bytes());
        }
        blob.extend_from_slice(&[0u8; 4]);
    }
    blob
}

#[tokio::test]
async fn test_configured_ladder_resolves_on_desktop() {
    let dir = tempfile::tempdir().unwrap();
    let blob_path = dir.path().join("layout.bin");
    fs::write(&blob_path, encode_layout(&["Recycle Bin", "report.docx"])).unwrap();
    let desktop_dir = dir.path().join("Desktop");
    let expected = desktop_dir.join("report.docx");

    let (url, server) = stub_server(vec![verdict_reply(&JudgmentVerdict::matched(
        expected.to_string_lossy(),
    ))])
    .await;

    let mut config = AgentConfig::default();
    config.oracle.url = url;
    config.desktop.blob_path = Some(blob_path);
    config.desktop.desktop_dir = Some(desktop_dir);
    config.search.roots = vec![dir.path().to_path_buf()];
    config.fallback.command = String::new();
    config.validate().unwrap();

    let resolver = Resolver::new(
        build_ladder(&config).unwrap(),
        Arc::new(HttpOracle::new(&config.oracle).unwrap()),
        config.resolver_config(),
    )
    .unwrap();
    let resolution = resolver.resolve("open the report").await.unwrap();

    assert_eq!(
        resolution.outcome,
        ResolutionOutcome::Satisfied {
            target_path: expected.clone()
        }
    );
    assert_eq!(resolution.iterations.len(), 1);

    let report_path = dir.path().join("report.json");
    locate_agent::telemetry::write_report(&resolution, &report_path).unwrap();
    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["outcome"]["status"], "satisfied");
    assert_eq!(report["iterations"][0]["tier"], "desktop");
    assert_eq!(report["transitions"].as_array().unwrap().len(), 3);

    let bodies = server.await.unwrap();
    let candidates = bodies[0]["messages"][1]["content"].as_str().unwrap();
    assert!(candidates.contains(&expected.display().to_string()));
    assert!(candidates.contains("Recycle Bin"));
}
