mod helpers;

use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use helpers::{create_job, spawn_job_store, STORE_TOKEN};

fn new_job_body(id: Uuid) -> Value {
    json!({ "id": id.to_string(), "r2_key": format!("raw/{id}.pdf") })
}

#[tokio::test]
async fn auth_required_for_every_route() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/jobs")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");

    let res = client
        .post(srv.url("/jobs"))
        .bearer_auth("wrong-token")
        .json(&new_job_body(Uuid::new_v4()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/users/u1"))
        .header("authorization", format!("Basic {STORE_TOKEN}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cors_preflight_needs_no_token() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();

    let res = client
        .request(reqwest::Method::OPTIONS, srv.url("/jobs"))
        .header("origin", "http://example.com")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "authorization,content-type")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(
        res.headers()["access-control-allow-origin"].to_str().unwrap(),
        "*"
    );
}

#[tokio::test]
async fn created_job_is_submitted_with_equal_timestamps() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();

    let created = create_job(&client, &srv, new_job_body(id)).await;
    assert_eq!(created["id"], id.to_string());
    assert_eq!(created["status"], "submitted");

    let res = client
        .get(srv.url(&format!("/jobs/{id}")))
        .bearer_auth(STORE_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let job: Value = res.json().await.unwrap();
    assert_eq!(job["status"], "submitted");
    assert_eq!(job["r2_key"], format!("raw/{id}.pdf"));
    assert_eq!(job["created_at"], job["updated_at"]);
    assert!(job["slurm_id"].is_null());
    assert!(job["results_url"].is_null());
}

#[tokio::test]
async fn create_rejects_bad_input() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "id": Uuid::new_v4().to_string() }),
        json!({ "r2_key": "raw/x.pdf" }),
        json!({ "id": "", "r2_key": "raw/x.pdf" }),
        json!({ "id": "not-a-uuid", "r2_key": "raw/x.pdf" }),
        json!({ "id": Uuid::new_v4().to_string(), "r2_key": "raw/x.pdf", "status": "queued" }),
    ] {
        let res = client
            .post(srv.url("/jobs"))
            .bearer_auth(STORE_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body}");
    }

    let res = client
        .post(srv.url("/jobs"))
        .bearer_auth(STORE_TOKEN)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn duplicate_job_id_conflicts() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();

    create_job(&client, &srv, new_job_body(id)).await;

    let res = client
        .post(srv.url("/jobs"))
        .bearer_auth(STORE_TOKEN)
        .json(&new_job_body(id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn missing_job_is_not_found() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();

    for path in [format!("/jobs/{}", Uuid::new_v4()), "/jobs/nope".to_string()] {
        let res = client
            .get(srv.url(&path))
            .bearer_auth(STORE_TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "not_found");
    }
}

#[tokio::test]
async fn list_filters_orders_and_clamps_limit() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let third = Uuid::new_v4();
    create_job(&client, &srv, json!({ "id": first.to_string(), "r2_key": "a", "user_id": "alice" })).await;
    create_job(&client, &srv, json!({ "id": second.to_string(), "r2_key": "b", "user_id": "bob" })).await;
    create_job(
        &client,
        &srv,
        json!({ "id": third.to_string(), "r2_key": "c", "user_id": "alice", "status": "running" }),
    )
    .await;

    let list = |query: &'static str| {
        let client = client.clone();
        let url = srv.url(&format!("/jobs{query}"));
        async move {
            let res = client.get(url).bearer_auth(STORE_TOKEN).send().await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            res.json::<Vec<Value>>().await.unwrap()
        }
    };

    let all = list("").await;
    let ids: Vec<_> = all.iter().map(|j| j["id"].as_str().unwrap().to_string()).collect();
    assert_eq!(ids, vec![third.to_string(), second.to_string(), first.to_string()]);

    assert_eq!(list("?limit=0").await.len(), 1);
    assert_eq!(list("?limit=-4").await.len(), 1);
    assert_eq!(list("?limit=5000").await.len(), 3);
    assert_eq!(list("?limit=abc").await.len(), 3);
    assert_eq!(list("?limit=2").await.len(), 2);

    let running = list("?status=running").await;
    assert_eq!(running.len(), 1);
    assert_eq!(running[0]["id"], third.to_string());

    let alice = list("?user_id=alice").await;
    assert_eq!(alice.len(), 2);

    let res = client
        .get(srv.url("/jobs?status=queued"))
        .bearer_auth(STORE_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_update_keeps_other_fields() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();
    let created = create_job(&client, &srv, new_job_body(id)).await;

    let put = |body: Value| {
        let client = client.clone();
        let url = srv.url(&format!("/jobs/{id}"));
        async move {
            let res = client
                .put(url)
                .bearer_auth(STORE_TOKEN)
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            res.json::<Value>().await.unwrap()
        }
    };

    let running = put(json!({ "status": "running", "slurm_id": "12345" })).await;
    assert_eq!(running["status"], "running");
    assert_eq!(running["slurm_id"], "12345");
    assert!(running["updated_at"].as_i64() >= created["updated_at"].as_i64());

    let done = put(json!({ "results_url": "https://results.example.org/x.pdf" })).await;
    assert_eq!(done["status"], "running");
    assert_eq!(done["slurm_id"], "12345");
    assert_eq!(done["results_url"], "https://results.example.org/x.pdf");
    assert_eq!(done["r2_key"], created["r2_key"]);
    assert_eq!(done["created_at"], created["created_at"]);
    assert!(done["updated_at"].as_i64() >= running["updated_at"].as_i64());

    let cleared = put(json!({ "slurm_id": "" })).await;
    assert!(cleared["slurm_id"].is_null());
    assert_eq!(cleared["results_url"], "https://results.example.org/x.pdf");

    let res = client
        .put(srv.url(&format!("/jobs/{id}")))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "status": "paused" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.url(&format!("/jobs/{}", Uuid::new_v4())))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "status": "failed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();
    create_job(&client, &srv, new_job_body(id)).await;

    for _ in 0..2 {
        let res = client
            .delete(srv.url(&format!("/jobs/{id}")))
            .bearer_auth(STORE_TOKEN)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }

    let res = client
        .get(srv.url(&format!("/jobs/{id}")))
        .bearer_auth(STORE_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_updates_leave_one_whole_record() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();
    let created = create_job(&client, &srv, new_job_body(id)).await;
    let url = srv.url(&format!("/jobs/{id}"));

    let (a, b) = futures::join!(
        client
            .put(&url)
            .bearer_auth(STORE_TOKEN)
            .json(&json!({ "status": "running", "slurm_id": "a" }))
            .send(),
        client
            .put(&url)
            .bearer_auth(STORE_TOKEN)
            .json(&json!({ "status": "failed", "slurm_id": "b" }))
            .send(),
    );
    assert_eq!(a.unwrap().status(), StatusCode::OK);
    assert_eq!(b.unwrap().status(), StatusCode::OK);

    let job: Value = client
        .get(&url)
        .bearer_auth(STORE_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let pair = (job["status"].as_str().unwrap(), job["slurm_id"].as_str().unwrap());
    assert!(
        pair == ("running", "a") || pair == ("failed", "b"),
        "unexpected mix {pair:?}"
    );
    assert_eq!(job["r2_key"], created["r2_key"]);
    assert_eq!(job["created_at"], created["created_at"]);
}

#[tokio::test]
async fn users_are_validated_and_stored() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "id": "u1", "email": "ada@example.org", "name": "Ada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["is_active"], true);
    assert!(user["organization"].is_null());

    let res = client
        .get(srv.url("/users/u1"))
        .bearer_auth(STORE_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched, user);

    for body in [
        json!({ "id": "u2", "email": "not-an-email" }),
        json!({ "email": "grace@example.org" }),
        json!({ "id": "u2" }),
    ] {
        let res = client
            .post(srv.url("/users"))
            .bearer_auth(STORE_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body}");
    }

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "id": "u3", "email": "ada@example.org" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .get(srv.url("/users/missing"))
        .bearer_auth(STORE_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn processing_metrics_require_an_existing_job() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();
    create_job(&client, &srv, new_job_body(id)).await;

    let post = |body: Value| {
        let client = client.clone();
        let url = srv.url("/metrics");
        async move {
            client
                .post(url)
                .bearer_auth(STORE_TOKEN)
                .json(&body)
                .send()
                .await
                .unwrap()
        }
    };

    let res = post(json!({ "id": "m1", "job_id": Uuid::new_v4().to_string() })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = post(json!({ "id": "m1" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = post(json!({
        "id": "m1",
        "job_id": id.to_string(),
        "processing_time_seconds": 12.5,
        "pdf_pages": 4,
        "pdf_size_bytes": 20480,
        "success": true
    }))
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let metric: Value = res.json().await.unwrap();
    assert_eq!(metric["job_id"], id.to_string());
    assert_eq!(metric["success"], true);
    assert_eq!(metric["pdf_pages"], 4);
    assert!(metric["error_message"].is_null());
}

#[tokio::test]
async fn integer_flags_are_accepted() {
    let (srv, _pool) = spawn_job_store().await;
    let client = reqwest::Client::new();
    let id = Uuid::new_v4();
    create_job(&client, &srv, new_job_body(id)).await;

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "id": "u1", "email": "ada@example.org", "is_active": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["is_active"], true);

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "id": "u2", "email": "grace@example.org", "is_active": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let user: Value = res.json().await.unwrap();
    assert_eq!(user["is_active"], false);

    let res = client
        .post(srv.url("/metrics"))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "id": "m1", "job_id": id.to_string(), "success": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let metric: Value = res.json().await.unwrap();
    assert_eq!(metric["success"], true);

    let res = client
        .post(srv.url("/metrics"))
        .bearer_auth(STORE_TOKEN)
        .json(&json!({ "id": "m2", "job_id": id.to_string(), "success": 7 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
