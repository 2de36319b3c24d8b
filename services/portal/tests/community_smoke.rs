mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{portal, read_json, seed_user};
use http_helpers::{authed_get, authed_json_request, json_request};
use portal::model::Role;
use tower::ServiceExt;

#[tokio::test]
async fn steward_signs_in_and_creates_channel() {
    let portal = portal();
    seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/signin",
            serde_json::json!({
                "email": "zara@hostel.example",
                "password": "steward-pass"
            }),
        ))
        .await
        .expect("signin");
    assert_eq!(response.status(), StatusCode::OK);
    let session = read_json(response).await;
    let token = session["token"].as_str().expect("token").to_string();
    assert_eq!(session["role"], "steward");

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &token,
            serde_json::json!({
                "name": "general",
                "description": "Hostel-wide announcements"
            }),
        ))
        .await
        .expect("create channel");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/channels", &token))
        .await
        .expect("list channels");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["items"].as_array().unwrap().len(), 1);
    assert_eq!(payload["items"][0]["name"], "general");
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let portal = portal();
    seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/signin",
            serde_json::json!({
                "email": "zara@hostel.example",
                "password": "wrong"
            }),
        ))
        .await
        .expect("signin");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn duplicate_channel_name_conflicts() {
    let portal = portal();
    let (_, token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let create = || {
        authed_json_request(
            "POST",
            "/v1/channels",
            &token,
            serde_json::json!({ "name": "events" }),
        )
    };
    let response = portal.app.clone().oneshot(create()).await.expect("create");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = portal.app.clone().oneshot(create()).await.expect("conflict");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json(response).await;
    assert_eq!(payload["code"], "already_exists");
    assert_eq!(payload["message"], "channel 'events' already exists");
}

#[tokio::test]
async fn signup_is_gated_until_approved() {
    let portal = portal();
    let response = portal
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/auth/signup",
            serde_json::json!({
                "email": "newcomer@hostel.example",
                "password": "first-password",
                "full_name": "New Comer"
            }),
        ))
        .await
        .expect("signup");
    assert_eq!(response.status(), StatusCode::CREATED);
    let session = read_json(response).await;
    let token = session["token"].as_str().expect("token").to_string();
    assert_eq!(session["profile"]["is_approved"], false);
    assert_eq!(session["role"], "member");

    // Community reads and writes refuse before any store mutation.
    for request in [
        authed_get("/v1/feed", &token),
        authed_get("/v1/channels", &token),
        authed_json_request(
            "POST",
            "/v1/posts",
            &token,
            serde_json::json!({
                "title": "hello",
                "subreddit_id": uuid::Uuid::new_v4()
            }),
        ),
    ] {
        let response = portal.app.clone().oneshot(request).await.expect("gated");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let payload = read_json(response).await;
        assert_eq!(payload["code"], "forbidden");
    }

    // The profile itself stays reachable so the pending state can render.
    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/profile", &token))
        .await
        .expect("profile");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_signup_email_conflicts() {
    let portal = portal();
    let body = serde_json::json!({
        "email": "same@hostel.example",
        "password": "first-password",
        "full_name": "Same Person"
    });
    let response = portal
        .app
        .clone()
        .oneshot(json_request("POST", "/v1/auth/signup", body.clone()))
        .await
        .expect("signup");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = portal
        .app
        .clone()
        .oneshot(json_request("POST", "/v1/auth/signup", body))
        .await
        .expect("duplicate");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn member_is_refused_steward_surfaces() {
    let portal = portal();
    let (_, token) = seed_user(
        &portal,
        "Arun Member",
        "arun@hostel.example",
        "member-pass",
        true,
        Role::Member,
    )
    .await;

    for request in [
        authed_json_request(
            "POST",
            "/v1/channels",
            &token,
            serde_json::json!({ "name": "forbidden" }),
        ),
        authed_get("/v1/admin/roster", &token),
        authed_json_request(
            "PATCH",
            &format!("/v1/posts/{}/pin", uuid::Uuid::new_v4()),
            &token,
            serde_json::json!({ "pinned": true }),
        ),
    ] {
        let response = portal.app.clone().oneshot(request).await.expect("refused");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn missing_token_is_unauthorized() {
    let portal = portal();
    let response = portal
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/feed")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn welcome_post_vote_scenario() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;
    let (_, a_token) = seed_user(
        &portal,
        "Asha A",
        "asha@hostel.example",
        "asha-pass",
        true,
        Role::Member,
    )
    .await;
    let (_, b_token) = seed_user(
        &portal,
        "Binod B",
        "binod@hostel.example",
        "binod-pass",
        true,
        Role::Member,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &steward_token,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .expect("channel");
    assert_eq!(response.status(), StatusCode::CREATED);
    let channel = read_json(response).await;
    let channel_id = channel["id"].as_str().expect("channel id").to_string();

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &a_token,
            serde_json::json!({
                "title": "Welcome",
                "content": "Welcome to the hostel community!",
                "subreddit_id": channel_id
            }),
        ))
        .await
        .expect("post");
    assert_eq!(response.status(), StatusCode::CREATED);
    let post = read_json(response).await;
    let post_id = post["id"].as_str().expect("post id").to_string();

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            &format!("/v1/posts/{post_id}/votes"),
            &b_token,
            serde_json::json!({ "vote_type": 1 }),
        ))
        .await
        .expect("vote");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["user_vote"], 1);

    // A sees the tally but not B's vote as their own.
    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/feed", &a_token))
        .await
        .expect("feed for A");
    let feed = read_json(response).await;
    let item = &feed["items"][0];
    assert_eq!(item["title"], "Welcome");
    assert_eq!(item["vote_count"], 1);
    assert_eq!(item["user_vote"], 0);
    assert_eq!(item["author_name"], "Asha A");
    assert_eq!(item["channel_name"], "general");
    assert_eq!(item["comment_count"], 0);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/feed", &b_token))
        .await
        .expect("feed for B");
    let feed = read_json(response).await;
    assert_eq!(feed["items"][0]["user_vote"], 1);
}

#[tokio::test]
async fn vote_toggles_and_flips_through_the_api() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;
    let (_, member_token) = seed_user(
        &portal,
        "Asha A",
        "asha@hostel.example",
        "asha-pass",
        true,
        Role::Member,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &steward_token,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .expect("channel");
    let channel = read_json(response).await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &member_token,
            serde_json::json!({
                "title": "Toggle me",
                "subreddit_id": channel["id"]
            }),
        ))
        .await
        .expect("post");
    let post = read_json(response).await;
    let vote_uri = format!("/v1/posts/{}/votes", post["id"].as_str().expect("id"));

    let cast = |vote_type: i64| {
        authed_json_request(
            "POST",
            &vote_uri,
            &member_token,
            serde_json::json!({ "vote_type": vote_type }),
        )
    };

    // Up, then up again removes; down then replaces an up.
    let payload = read_json(portal.app.clone().oneshot(cast(1)).await.expect("up")).await;
    assert_eq!(payload["user_vote"], 1);
    let payload = read_json(portal.app.clone().oneshot(cast(1)).await.expect("un-vote")).await;
    assert_eq!(payload["user_vote"], 0);
    let payload = read_json(portal.app.clone().oneshot(cast(1)).await.expect("up")).await;
    assert_eq!(payload["user_vote"], 1);
    let payload = read_json(portal.app.clone().oneshot(cast(-1)).await.expect("flip")).await;
    assert_eq!(payload["user_vote"], -1);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/feed", &member_token))
        .await
        .expect("feed");
    let feed = read_json(response).await;
    assert_eq!(feed["items"][0]["vote_count"], -1);

    // Out-of-range direction is rejected before the ledger sees it.
    let response = portal.app.clone().oneshot(cast(2)).await.expect("invalid");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_validation_and_missing_channel() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &steward_token,
            serde_json::json!({
                "title": "   ",
                "subreddit_id": uuid::Uuid::new_v4()
            }),
        ))
        .await
        .expect("empty title");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &steward_token,
            serde_json::json!({
                "title": "No channel",
                "subreddit_id": uuid::Uuid::new_v4()
            }),
        ))
        .await
        .expect("missing channel");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_thread_and_count() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &steward_token,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .expect("channel");
    let channel = read_json(response).await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &steward_token,
            serde_json::json!({
                "title": "Discuss",
                "subreddit_id": channel["id"]
            }),
        ))
        .await
        .expect("post");
    let post = read_json(response).await;
    let comments_uri = format!("/v1/posts/{}/comments", post["id"].as_str().expect("id"));

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            &comments_uri,
            &steward_token,
            serde_json::json!({ "content": "first!" }),
        ))
        .await
        .expect("comment");
    assert_eq!(response.status(), StatusCode::CREATED);
    let root = read_json(response).await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            &comments_uri,
            &steward_token,
            serde_json::json!({ "content": "reply", "parent_id": root["id"] }),
        ))
        .await
        .expect("reply");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            &comments_uri,
            &steward_token,
            serde_json::json!({ "content": "orphan", "parent_id": uuid::Uuid::new_v4() }),
        ))
        .await
        .expect("orphan");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/feed", &steward_token))
        .await
        .expect("feed");
    let feed = read_json(response).await;
    assert_eq!(feed["items"][0]["comment_count"], 2);
}

#[tokio::test]
async fn pinning_reorders_the_feed() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &steward_token,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .expect("channel");
    let channel = read_json(response).await;

    let mut post_ids = Vec::new();
    for title in ["oldest", "middle", "newest"] {
        let response = portal
            .app
            .clone()
            .oneshot(authed_json_request(
                "POST",
                "/v1/posts",
                &steward_token,
                serde_json::json!({
                    "title": title,
                    "subreddit_id": channel["id"]
                }),
            ))
            .await
            .expect("post");
        let post = read_json(response).await;
        post_ids.push(post["id"].as_str().expect("id").to_string());
    }

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "PATCH",
            &format!("/v1/posts/{}/pin", post_ids[0]),
            &steward_token,
            serde_json::json!({ "pinned": true }),
        ))
        .await
        .expect("pin");
    assert_eq!(response.status(), StatusCode::OK);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/feed", &steward_token))
        .await
        .expect("feed");
    let feed = read_json(response).await;
    let titles: Vec<&str> = feed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["oldest", "newest", "middle"]);
}

#[tokio::test]
async fn snapshot_and_changes_surface_mutations() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &steward_token,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .expect("channel");
    let channel = read_json(response).await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/posts/snapshot", &steward_token))
        .await
        .expect("snapshot");
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = read_json(response).await;
    assert_eq!(snapshot["items"].as_array().unwrap().len(), 0);
    let since = snapshot["next_seq"].as_u64().expect("next_seq");

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &steward_token,
            serde_json::json!({
                "title": "after snapshot",
                "subreddit_id": channel["id"]
            }),
        ))
        .await
        .expect("post");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get(
            &format!("/v1/posts/changes?since={since}"),
            &steward_token,
        ))
        .await
        .expect("changes");
    assert_eq!(response.status(), StatusCode::OK);
    let changes = read_json(response).await;
    let items = changes["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["op"], "created");
    assert_eq!(items[0]["post"]["title"], "after snapshot");
}

#[tokio::test]
async fn poll_posts_return_options_in_the_feed() {
    let portal = portal();
    let (_, steward_token) = seed_user(
        &portal,
        "Zara Steward",
        "zara@hostel.example",
        "steward-pass",
        true,
        Role::Steward,
    )
    .await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/channels",
            &steward_token,
            serde_json::json!({ "name": "general" }),
        ))
        .await
        .expect("channel");
    let channel = read_json(response).await;

    let response = portal
        .app
        .clone()
        .oneshot(authed_json_request(
            "POST",
            "/v1/posts",
            &steward_token,
            serde_json::json!({
                "title": "Mess menu vote",
                "subreddit_id": channel["id"],
                "poll_options": ["North Indian", "South Indian"]
            }),
        ))
        .await
        .expect("poll post");
    assert_eq!(response.status(), StatusCode::CREATED);
    let post = read_json(response).await;
    assert_eq!(post["is_poll"], true);

    let response = portal
        .app
        .clone()
        .oneshot(authed_get("/v1/feed", &steward_token))
        .await
        .expect("feed");
    let feed = read_json(response).await;
    let options = feed["items"][0]["poll_options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["option_text"], "North Indian");
    assert_eq!(options[0]["votes"], 0);
}
