//! Client operations against the mock daemon over real HTTP.
//!
//! # Design
//! Each test starts its own mock daemon on a random port in a background
//! thread with a current-thread tokio runtime, then drives the blocking
//! client from the test thread.

use mock_daemon::Daemon;
use serde_json::json;
use synctl_core::{ApiError, ClientConfig, PrefValue, Reply, SyncControlClient};

fn start_daemon() -> (Daemon, SyncControlClient) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let daemon = Daemon::new();
    let served = daemon.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_daemon::serve(listener, served).await
        })
        .unwrap();
    });

    let client = SyncControlClient::new(ClientConfig::new("127.0.0.1", addr.port()));
    (daemon, client)
}

#[test]
fn folder_lifecycle() {
    let (daemon, client) = start_daemon();

    // Step 1: nothing synced yet; an empty list, not the no-result sentinel.
    let folders = client.list_folders(None).unwrap();
    assert_eq!(folders, Some(Reply::Shaped(Vec::new())));

    // Step 2: add a folder under a known secret.
    let status = client.add_folder("/srv/photos", Some("ABC"), false).unwrap();
    assert!(status.shaped().unwrap().is_ok());

    // Step 3: look it up by secret.
    let folders = client.list_folders(Some("ABC")).unwrap().unwrap().shaped().unwrap();
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].dir, "/srv/photos");
    assert_eq!(folders[0].extra["type"], "read_write");

    // Step 4: adding it again is a daemon error, returned as-is.
    let status = client.add_folder("/srv/photos", Some("ABC"), false).unwrap();
    let status = status.shaped().unwrap();
    assert!(!status.is_ok());
    assert_eq!(status.error, mock_daemon::ERR_DUPLICATE_FOLDER);

    // Step 5: secrets, with and without the encrypted variant.
    let secrets = client.get_secrets("ABC", false).unwrap().shaped().unwrap();
    assert_eq!(secrets.read_write.as_deref(), Some("ABC"));
    assert!(secrets.encryption.is_none());
    let secrets = client.get_secrets("ABC", true).unwrap().shaped().unwrap();
    assert!(secrets.encryption.is_some());

    // Step 6: peers of a fresh folder.
    let peers = client.list_folder_peers("ABC").unwrap();
    assert_eq!(peers, Reply::Shaped(Vec::new()));

    // Step 7: remove, then the lookup comes back empty.
    let status = client.remove_folder("ABC").unwrap();
    assert!(status.shaped().unwrap().is_ok());
    let folders = client.list_folders(Some("ABC")).unwrap();
    assert_eq!(folders, Some(Reply::Shaped(Vec::new())));

    let queries = daemon.queries_blocking();
    assert_eq!(queries[0], "method=get_folders");
    assert_eq!(queries[1], "method=add_folder&dir=%2Fsrv%2Fphotos&secret=ABC&selective_sync=0");
    assert_eq!(queries[2], "method=get_folders&secret=ABC");
}

#[test]
fn folder_settings_round_trip() {
    let (daemon, client) = start_daemon();
    client.add_folder("/srv/docs", Some("S"), false).unwrap();

    let hosts = client
        .set_folder_hosts("S", ["1.2.3.4:1234", "5.6.7.8:5678"])
        .unwrap()
        .shaped()
        .unwrap();
    assert_eq!(hosts.hosts, vec!["1.2.3.4:1234", "5.6.7.8:5678"]);
    let fetched = client.get_folder_hosts("S").unwrap().shaped().unwrap();
    assert_eq!(fetched, hosts);

    let prefs = client
        .set_folder_prefs("S", [("use_dht", true), ("use_relay_server", false)])
        .unwrap()
        .shaped()
        .unwrap();
    assert_eq!(prefs["use_dht"], 1);
    assert_eq!(prefs["use_relay_server"], 0);
    let fetched = client.get_folder_prefs("S").unwrap().shaped().unwrap();
    assert_eq!(fetched, prefs);

    let set_prefs_query = daemon.queries_blocking().into_iter().rev().nth(1).unwrap();
    assert_eq!(set_prefs_query, "method=set_folder_prefs&secret=S&use_dht=1&use_relay_server=0");
}

#[test]
fn selective_sync_files() {
    let (_daemon, client) = start_daemon();
    client.add_folder("/srv/media", Some("SEL"), true).unwrap();

    let entries = client
        .set_file_prefs("SEL", "movies/a.mkv", true)
        .unwrap()
        .shaped()
        .unwrap();
    assert_eq!(entries[0].name, "movies/a.mkv");
    assert_eq!(entries[0].kind, "file");
    assert_eq!(entries[0].extra["download"], 1);

    let all = client.list_files("SEL", None).unwrap().shaped().unwrap();
    assert_eq!(all.len(), 1);
    let none = client.list_files("SEL", Some("music")).unwrap().shaped().unwrap();
    assert!(none.is_empty());
}

#[test]
fn unknown_secret_passes_daemon_error_through() {
    let (_daemon, client) = start_daemon();
    let reply = client.get_folder_hosts("NOPE").unwrap();
    assert_eq!(
        reply,
        Reply::Raw(json!({"error": mock_daemon::ERR_INVALID_SECRET, "message": "Invalid secret"}))
    );
}

#[test]
fn global_prefs() {
    let (daemon, client) = start_daemon();

    // Reading twice with no change in between yields the same structure.
    let first = client.get_prefs().unwrap();
    let second = client.get_prefs().unwrap();
    assert_eq!(first, second);

    // set_prefs reaches the daemon and returns its current settings.
    let updated = client
        .set_prefs([
            ("device_name", PrefValue::from("backup-box")),
            ("upload_limit", PrefValue::from(256_i64)),
            ("use_upnp", PrefValue::from(false)),
        ])
        .unwrap()
        .shaped()
        .unwrap();
    assert_eq!(updated["device_name"], "backup-box");
    assert_eq!(updated["upload_limit"], 256);
    assert_eq!(updated["use_upnp"], 0);
    assert_eq!(client.get_prefs().unwrap().shaped().unwrap(), updated);

    assert!(daemon
        .queries_blocking()
        .contains(&"method=set_prefs&device_name=backup-box&upload_limit=256&use_upnp=0".to_string()));
}

#[test]
fn status_queries() {
    let (_daemon, client) = start_daemon();

    let version = client.get_version().unwrap().shaped().unwrap();
    assert_eq!(version.version, mock_daemon::VERSION);
    assert!(!client.get_os().unwrap().shaped().unwrap().os.is_empty());
    let speed = client.get_speed().unwrap().shaped().unwrap();
    assert_eq!((speed.download, speed.upload), (0, 0));
    assert!(client.shutdown().unwrap().shaped().unwrap().is_ok());
}

#[test]
fn no_daemon_is_a_transport_failure() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = SyncControlClient::new(ClientConfig::new("127.0.0.1", port));

    assert!(matches!(client.get_version(), Err(ApiError::Transport(_))));
    assert!(matches!(client.list_folders(None), Err(ApiError::Transport(_))));
}
