//! Contract tests: the client against the in-memory backend over real HTTP.

use std::sync::Arc;
use std::time::Duration;

use goodtrip_client::types::api::AddNoteRequest;
use goodtrip_client::types::models::CountryVisit;
use goodtrip_client::{
    ClientConfig, ClientError, Credentials, ErrorKind, Feed, GoodTripClient, SignUpForm, TripDraft,
    TripValidationError,
};
use goodtrip_mock::MockServer;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const PASSWORD: &str = "caravan-road";

async fn setup() -> (MockServer, GoodTripClient) {
    let server = MockServer::start().await.unwrap();
    server
        .store()
        .register("marco", "marco", PASSWORD, "Marco", "Polo")
        .unwrap();
    let client = GoodTripClient::new(ClientConfig::new(server.url())).unwrap();
    (server, client)
}

const LOGIN_BODY: &str =
    r#"{"id":1,"handle":"marco","name":"Marco","surname":"Polo","token":"raw-token"}"#;

/// A bare HTTP/1.1 backend. `reply` maps each request line to a JSON body,
/// or to `None` to keep the connection open without ever answering. Every
/// request line is reported on the returned channel.
async fn raw_backend<F>(reply: F) -> (String, mpsc::UnboundedReceiver<String>)
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let reply = Arc::new(reply);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let seen = seen_tx.clone();
            tokio::spawn(async move {
                let line = read_request(&mut socket).await;
                let answer = reply(&line);
                let _ = seen.send(line);
                match answer {
                    Some(body) => {
                        let response = format!(
                            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    }
                }
            });
        }
    });

    (url, seen_rx)
}

/// Read one request (headers and body) and return its request line.
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string()
}

fn draft(name: &str) -> TripDraft {
    TripDraft::new(name)
        .dates("01.09.2024", "20.09.2024")
        .budget("2400")
}

#[tokio::test]
async fn login_yields_session_with_token_and_one_refresh_task() {
    let (_server, client) = setup().await;

    let session = client.session().login("marco", PASSWORD).await.unwrap();
    assert!(!session.token.is_empty());
    assert_eq!(session.handle, "marco");
    assert_eq!(session.display_name, "Marco Polo");
    assert!(client.session().is_logged_in());
    assert_eq!(client.session().active_refresh_tasks(), 1);
}

#[tokio::test]
async fn wrong_password_is_rejected_with_status() {
    let (_server, client) = setup().await;

    let err = client.session().login("marco", "not-it").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Username or password are not correct"));
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn sign_up_with_taken_username_is_rejected() {
    let (_server, client) = setup().await;

    let err = client
        .session()
        .sign_up(SignUpForm {
            credentials: Credentials::new("marco", PASSWORD),
            handle: "marco2".into(),
            name: "Marco".into(),
            surname: "Again".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));
    assert!(err.to_string().contains("already taken"));
}

#[tokio::test]
async fn country_visits_survive_the_round_trip() {
    let (_server, client) = setup().await;
    client
        .session()
        .sign_up(SignUpForm {
            credentials: Credentials::new("ibn", PASSWORD),
            handle: "ibn".into(),
            name: "Ibn".into(),
            surname: "Battuta".into(),
        })
        .await
        .unwrap();

    let mut draft = draft("Grand tour");
    draft.add_country("Italy", ["Rome", "Florence"]);
    let created = client.trips().create_trip(&draft).await.unwrap();

    assert_eq!(created.name, "Grand tour");
    assert_eq!(created.countries.len(), 1);
    let visit = &created.countries[0];
    assert!(visit.id.is_some());
    assert_eq!(visit.country.name, "Italy");
    assert_eq!(visit.city_names(), vec!["Rome", "Florence"]);

    let fetched = client.trips().trip(created.id).await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn invalid_drafts_never_reach_the_server() {
    let (server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();
    let before = server.requests();

    let too_long = draft(&"n".repeat(33));
    let blank = draft("   ");
    let backwards = draft("Backwards").dates("20.09.2024", "01.09.2024");

    for (draft, expected) in [
        (too_long, TripValidationError::Name),
        (blank, TripValidationError::Name),
        (backwards, TripValidationError::DateOrder),
    ] {
        match client.trips().create_trip(&draft).await {
            Err(ClientError::Validation(e)) => assert_eq!(e, expected),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    assert_eq!(server.requests(), before);
}

#[tokio::test]
async fn logout_rejects_calls_before_sending() {
    let (server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();
    client.session().logout().await;

    assert!(client.session().current().is_none());
    assert_eq!(client.session().active_refresh_tasks(), 0);

    let before = server.requests();
    let err = client.trips().my_trips().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    let err = client.trips().create_trip(&draft("After logout")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAuthenticated);
    assert_eq!(server.requests(), before);
}

#[tokio::test]
async fn notes_and_country_visits_can_be_added_and_removed() {
    let (_server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();
    let trip = client.trips().create_trip(&draft("Silk road")).await.unwrap();

    let note = client
        .trips()
        .add_note(&AddNoteRequest {
            trip_id: trip.id,
            text: "Camels everywhere".into(),
            photo_url: None,
        })
        .await
        .unwrap();
    assert_eq!(client.trips().note(note.id).await.unwrap(), note);

    client.trips().delete_note(note.id).await.unwrap();
    let err = client.trips().note(note.id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let visit = client
        .trips()
        .add_country_visit(trip.id, &CountryVisit::new("Uzbekistan", ["Samarkand", "Bukhara"]))
        .await
        .unwrap();
    let stored = client.trips().trip(trip.id).await.unwrap();
    assert_eq!(stored.countries, vec![visit.clone()]);

    client
        .trips()
        .delete_country_visit(visit.id.unwrap())
        .await
        .unwrap();
    assert!(client.trips().trip(trip.id).await.unwrap().countries.is_empty());
}

#[tokio::test]
async fn deleted_trip_is_gone() {
    let (_server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();
    let trip = client.trips().create_trip(&draft("Short lived")).await.unwrap();

    client.trips().delete_trip(trip.id).await.unwrap();
    let err = client.trips().trip(trip.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Rejected);
    assert_eq!(err.status(), Some(404));
    assert!(client.trips().my_trips().await.unwrap().is_empty());
}

#[tokio::test]
async fn other_users_trips_cannot_be_deleted() {
    let (server, client) = setup().await;
    let ibn = server
        .store()
        .register("ibn", "ibn", PASSWORD, "Ibn", "Battuta")
        .unwrap();
    let theirs = server
        .store()
        .add_trip(ibn.id, draft("Rihla").validate().unwrap())
        .unwrap();

    client.session().login("marco", PASSWORD).await.unwrap();
    let err = client.trips().delete_trip(theirs.id).await.unwrap_err();
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn feed_merges_followed_trips_newest_first() {
    let (server, client) = setup().await;
    let ibn = server
        .store()
        .register("ibn", "ibn", PASSWORD, "Ibn", "Battuta")
        .unwrap();
    server
        .store()
        .add_trip(ibn.id, draft("Rihla").validate().unwrap())
        .unwrap();

    client.session().login("marco", PASSWORD).await.unwrap();
    client.trips().create_trip(&draft("Cathay")).await.unwrap();

    let mut feed = Feed::default();
    assert_eq!(client.feed().refresh(&mut feed).await.unwrap(), 1);

    client.social().follow("ibn").await.unwrap();
    client.trips().create_trip(&draft("Return to Venice")).await.unwrap();

    assert_eq!(client.feed().refresh(&mut feed).await.unwrap(), 3);
    let names: Vec<&str> = feed.trips().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Return to Venice", "Cathay", "Rihla"]);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_feed() {
    let (_server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();
    client.trips().create_trip(&draft("Cathay")).await.unwrap();

    let mut feed = Feed::default();
    client.feed().refresh(&mut feed).await.unwrap();

    client.session().logout().await;
    assert!(client.feed().refresh(&mut feed).await.is_err());
    assert_eq!(feed.len(), 1);
}

#[tokio::test]
async fn follow_graph_is_visible_from_both_sides() {
    let (server, client) = setup().await;
    let ibn = server
        .store()
        .register("ibn", "ibn", PASSWORD, "Ibn", "Battuta")
        .unwrap();

    let me = client.session().login("marco", PASSWORD).await.unwrap();
    client.social().follow("ibn").await.unwrap();

    let subscriptions = client.social().subscriptions(me.user_id).await.unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].display_name(), "Ibn Battuta");

    let followers = client.social().followers(ibn.id).await.unwrap();
    assert_eq!(followers[0].handle, "marco");

    client.social().unfollow("ibn").await.unwrap();
    assert!(client.social().subscriptions(me.user_id).await.unwrap().is_empty());

    let err = client.social().follow("nobody").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn photo_update_reaches_session_and_server() {
    let (_server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();

    let session = client
        .session()
        .update_photo("https://img.example/marco.png")
        .await
        .unwrap();
    assert_eq!(session.avatar_url.as_deref(), Some("https://img.example/marco.png"));

    let relogged = client.session().login("marco", PASSWORD).await.unwrap();
    assert_eq!(relogged.avatar_url.as_deref(), Some("https://img.example/marco.png"));
}

#[tokio::test]
async fn cancelled_calls_fail_with_cancelled() {
    let (_server, client) = setup().await;
    client.session().login("marco", PASSWORD).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client.trips().with_cancel(cancel).my_trips().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    // The uncancelled service is unaffected.
    assert!(client.trips().my_trips().await.is_ok());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = GoodTripClient::new(ClientConfig::new(format!("http://{}", addr))).unwrap();
    let err = client.session().login("marco", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn handles_are_sent_as_single_path_segments() {
    let (server, client) = setup().await;
    for (username, handle) in [("ibn", "ibn"), ("ibnx", "ibn#x"), ("ibnq", "ibn?q=1%")] {
        server
            .store()
            .register(username, handle, PASSWORD, "Ibn", "Battuta")
            .unwrap();
    }

    let me = client.session().login("marco", PASSWORD).await.unwrap();
    client.social().follow("ibn#x").await.unwrap();
    client.social().follow("ibn?q=1%").await.unwrap();

    let mut handles: Vec<String> = client
        .social()
        .subscriptions(me.user_id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.handle)
        .collect();
    handles.sort();
    assert_eq!(handles, vec!["ibn#x", "ibn?q=1%"]);

    client.social().unfollow("ibn#x").await.unwrap();
    let remaining = client.social().subscriptions(me.user_id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].handle, "ibn?q=1%");
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let (url, _seen) = raw_backend(|line| {
        if line.contains("/auth/login") {
            Some(LOGIN_BODY.to_string())
        } else if line.contains("/trip/all/") {
            Some(r#"[{"id": 1, "name": "#.to_string())
        } else {
            Some("[1, 2, 3]".to_string())
        }
    })
    .await;
    let client = GoodTripClient::new(ClientConfig::new(url)).unwrap();
    client.session().login("marco", PASSWORD).await.unwrap();

    let err = client.trips().my_trips().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);

    // Valid JSON of the wrong shape is undecodable too.
    let err = client.trips().trip(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn malformed_login_body_leaves_no_session() {
    let (url, _seen) = raw_backend(|_| Some(r#"{"id": "#.to_string())).await;
    let client = GoodTripClient::new(ClientConfig::new(url)).unwrap();

    let err = client.session().login("marco", PASSWORD).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn logout_aborts_in_flight_calls() {
    let (url, mut seen) = raw_backend(|line| {
        line.contains("/auth/login")
            .then(|| LOGIN_BODY.to_string())
    })
    .await;
    let client = GoodTripClient::new(ClientConfig::new(url)).unwrap();
    client.session().login("marco", PASSWORD).await.unwrap();
    assert!(seen.recv().await.unwrap().contains("/auth/login"));

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.trips().my_trips().await })
    };
    // Wait until the backend holds the request open.
    assert!(seen.recv().await.unwrap().contains("/trip/all/1"));

    client.session().logout().await;
    let err = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}
