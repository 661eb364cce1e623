//! End-to-end tests over the plugin unix socket.
//!
//! Each test drives the full path: HTTP request → transport → driver →
//! file store / recording mount engine.

use hyper::{Body, Request, StatusCode};
use libvolume::RemoteStore;
use serde_json::json;

use crate::common::PluginHarness;

#[tokio::test]
async fn activate_handshake() {
    let plugin = PluginHarness::start().await;
    let (status, body) = plugin.post("/Plugin.Activate", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Implements": ["VolumeDriver"]}));
    plugin.close().await;
}

#[tokio::test]
async fn backup_volume_lifecycle() {
    let plugin = PluginHarness::start().await;
    let mountpoint = plugin.base_dir().join("backup");

    let (status, body) = plugin
        .post(
            "/VolumeDriver.Create",
            r#"{"Name":"backup","Opts":{"type":"s3","bucket":"b1"}}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(mountpoint.is_dir());

    let (_, body) = plugin.post("/VolumeDriver.Get", r#"{"Name":"backup"}"#).await;
    assert_eq!(
        body,
        json!({"Volume": {
            "Name": "backup",
            "Mountpoint": mountpoint.to_string_lossy(),
            "Status": {"type": "s3", "bucket": "b1"},
        }})
    );

    let (status, body) = plugin
        .post("/VolumeDriver.Mount", r#"{"Name":"backup","ID":"c1"}"#)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({"Mountpoint": mountpoint.to_string_lossy()}));
    assert_eq!(
        plugin.driver.engine().attached.lock().unwrap().as_slice(),
        [(mountpoint.clone(), "backup:".to_owned())]
    );

    let (status, _) = plugin
        .post("/VolumeDriver.Unmount", r#"{"Name":"backup","ID":"c1"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        plugin.driver.engine().detached.lock().unwrap().as_slice(),
        [mountpoint.clone()]
    );

    let (status, _) = plugin
        .post("/VolumeDriver.Remove", r#"{"Name":"backup"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = plugin.post("/VolumeDriver.Get", r#"{"Name":"backup"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"Err": "volume backup not found"}));
    assert!(mountpoint.is_dir(), "remove must not delete the mountpoint");

    plugin.close().await;
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let plugin = PluginHarness::start().await;
    let create = r#"{"Name":"dup","Opts":{"type":"local"}}"#;

    let (status, _) = plugin.post("/VolumeDriver.Create", create).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = plugin.post("/VolumeDriver.Create", create).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"Err": "volume dup already exists"}));

    plugin.close().await;
}

#[tokio::test]
async fn list_mirrors_the_store() {
    let plugin = PluginHarness::start().await;
    for name in ["zeta", "alpha"] {
        let body = format!(r#"{{"Name":"{name}","Opts":{{"type":"local"}}}}"#);
        let (status, _) = plugin.post("/VolumeDriver.Create", &body).await;
        assert_eq!(status, StatusCode::OK);
    }
    plugin
        .driver
        .store()
        .create_remote("middle", "sftp", Default::default(), true)
        .await
        .unwrap();

    let (status, body) = plugin.post("/VolumeDriver.List", "").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["Volumes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["Name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["alpha", "middle", "zeta"]);

    plugin.close().await;
}

#[tokio::test]
async fn remove_unknown_volume_succeeds() {
    let plugin = PluginHarness::start().await;
    let (status, body) = plugin
        .post("/VolumeDriver.Remove", r#"{"Name":"ghost"}"#)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({}));
    plugin.close().await;
}

#[tokio::test]
async fn capabilities_and_unknown_endpoints() {
    let plugin = PluginHarness::start().await;

    let (status, body) = plugin.post("/VolumeDriver.Capabilities", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"Capabilities": {"Scope": "local"}}));

    let (status, body) = plugin.post("/IpamDriver.RequestPool", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["Err"].as_str().unwrap().contains("unknown endpoint"));

    plugin.close().await;
}

#[tokio::test]
async fn definitions_survive_a_restart() {
    let plugin = PluginHarness::start().await;
    let (status, _) = plugin
        .post(
            "/VolumeDriver.Create",
            r#"{"Name":"keep","Opts":{"type":"local"}}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let store = libvolume::store::FileRemoteStore::new(plugin.dir.path().join("remotes.json"));
    assert_eq!(store.dump_remote("keep").await.unwrap()["type"], "local");

    plugin.close().await;
}

#[tokio::test]
async fn only_post_is_accepted() {
    let plugin = PluginHarness::start().await;
    let request = Request::get("/VolumeDriver.List")
        .header("host", "plugin")
        .body(Body::empty())
        .unwrap();

    let (status, body) = plugin.send(request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body["Err"].as_str().unwrap().contains("GET"));

    plugin.close().await;
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let plugin = PluginHarness::start().await;
    // Announce more than the server accepts and never send the data; the
    // server must answer from the headers alone.
    let (_tx, body) = Body::channel();
    let request = Request::post("/VolumeDriver.Create")
        .header("host", "plugin")
        .header(hyper::header::CONTENT_LENGTH, "2097152")
        .body(body)
        .unwrap();

    let (status, body) = plugin.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["Err"].as_str().unwrap().contains("exceeds"));
    assert!(!plugin.base_dir().exists());

    plugin.close().await;
}
