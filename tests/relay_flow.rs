//! End-to-end relay tests over real WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_test::assert_ok;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use platformer_relay::app::AppState;
use platformer_relay::config::Config;
use platformer_relay::game::{ClientSession, InputState, SessionConfig};
use platformer_relay::http::build_router;
use platformer_relay::ws::protocol::{
    ClientMsg, ConnectionId, PlayerSpawn, PositionUpdate, ServerMsg, Welcome,
};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay(config: Config) -> SocketAddr {
    let router = build_router(AppState::new(config));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> (Client, ConnectionId) {
    let (mut ws, _) = assert_ok!(connect_async(format!("ws://{}/ws", addr)).await);
    match recv(&mut ws).await {
        ServerMsg::Welcome(welcome) => (ws, welcome.id),
        other => panic!("expected welcome, got {:?}", other),
    }
}

async fn recv(ws: &mut Client) -> ServerMsg {
    loop {
        let frame = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for relay")
            .expect("connection closed")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn send(ws: &mut Client, msg: &ClientMsg) {
    let json = serde_json::to_string(msg).unwrap();
    assert_ok!(ws.send(Message::Text(json)).await);
}

/// Round trip through the relay; everything sent before is processed once
/// the echo comes back
async fn sync(ws: &mut Client, id: ConnectionId) {
    let marker = PositionUpdate {
        id,
        x: -1.0,
        y: -1.0,
        angle: None,
    };
    send(ws, &ClientMsg::PlayerPosition(marker.clone())).await;
    loop {
        if recv(ws).await == ServerMsg::PlayerPosition(marker.clone()) {
            return;
        }
    }
}

fn spawn(color: &str) -> PlayerSpawn {
    PlayerSpawn {
        x: 400.0,
        y: 300.0,
        width: 40.0,
        height: 40.0,
        angle: 0.0,
        color: color.to_string(),
    }
}

#[tokio::test]
async fn two_clients_join_and_leave() {
    let addr = start_relay(Config::default()).await;
    let (mut a, a_id) = connect(addr).await;
    let (mut b, b_id) = connect(addr).await;
    assert_ne!(a_id, b_id);

    // Nobody announced yet: the first thing A hears back is its own marker
    send(&mut a, &ClientMsg::ShowPlayers).await;
    let marker = PositionUpdate {
        id: a_id,
        x: 1.0,
        y: 2.0,
        angle: None,
    };
    send(&mut a, &ClientMsg::PlayerPosition(marker.clone())).await;
    assert_eq!(recv(&mut a).await, ServerMsg::PlayerPosition(marker.clone()));
    assert_eq!(recv(&mut b).await, ServerMsg::PlayerPosition(marker));

    send(&mut b, &ClientMsg::NewPlayer(spawn("#bbbbbb"))).await;
    match recv(&mut a).await {
        ServerMsg::PlayerConnected(descriptor) => {
            assert_eq!(descriptor.id, b_id);
            assert_eq!(descriptor.color, "#bbbbbb");
        }
        other => panic!("expected playerConnected, got {:?}", other),
    }

    assert_ok!(a.close(None).await);
    assert_eq!(recv(&mut b).await, ServerMsg::PlayerDisconnected(a_id));
}

#[tokio::test]
async fn late_joiner_gets_roster_with_spawn_positions() {
    let addr = start_relay(Config::default()).await;
    let (mut a, a_id) = connect(addr).await;

    send(&mut a, &ClientMsg::NewPlayer(spawn("#aaaaaa"))).await;
    send(
        &mut a,
        &ClientMsg::PlayerMove(PositionUpdate {
            id: a_id,
            x: 10.0,
            y: 20.0,
            angle: Some(0.0),
        }),
    )
    .await;
    sync(&mut a, a_id).await;

    let (mut c, _) = connect(addr).await;
    send(&mut c, &ClientMsg::ShowPlayers).await;

    match recv(&mut c).await {
        ServerMsg::PlayerConnected(descriptor) => {
            assert_eq!(descriptor.id, a_id);
            assert_eq!((descriptor.x, descriptor.y), (400.0, 300.0));
        }
        other => panic!("expected roster replay, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_frames_are_dropped_without_closing() {
    let addr = start_relay(Config::default()).await;
    let (mut a, a_id) = connect(addr).await;

    assert_ok!(a.send(Message::Text("not json".to_string())).await);
    assert_ok!(
        a.send(Message::Text(
            r##"{"event":"newPlayer","data":{"x":0,"y":0,"width":-1,"height":1,"color":"#fff"}}"##
                .to_string()
        ))
        .await
    );

    sync(&mut a, a_id).await;
}

#[tokio::test]
async fn strict_ids_rewrite_spoofed_positions() {
    let addr = start_relay(Config {
        strict_ids: true,
        ..Config::default()
    })
    .await;
    let (mut a, a_id) = connect(addr).await;
    let spoofed = uuid::Uuid::new_v4();

    send(
        &mut a,
        &ClientMsg::PlayerMove(PositionUpdate {
            id: spoofed,
            x: 5.0,
            y: 5.0,
            angle: Some(0.0),
        }),
    )
    .await;

    match recv(&mut a).await {
        ServerMsg::PlayerMove(update) => assert_eq!(update.id, a_id),
        other => panic!("expected playerMove, got {:?}", other),
    }
}

#[tokio::test]
async fn sessions_mirror_each_other_through_relay() {
    let addr = start_relay(Config::default()).await;

    let (mut a, a_id) = connect(addr).await;
    let mut session_a = ClientSession::new(SessionConfig::default());
    for reply in session_a.on_message(ServerMsg::Welcome(Welcome {
        id: a_id,
        server_time: 0,
    })) {
        send(&mut a, &reply).await;
    }
    sync(&mut a, a_id).await;

    let (mut b, b_id) = connect(addr).await;
    let mut session_b = ClientSession::new(SessionConfig::default());
    for reply in session_b.on_message(ServerMsg::Welcome(Welcome {
        id: b_id,
        server_time: 0,
    })) {
        send(&mut b, &reply).await;
    }

    // B learns about A from the roster replay
    while session_b.remotes().get(&a_id).is_none() {
        let msg = recv(&mut b).await;
        session_b.on_message(msg);
    }

    // A learns about B from the join broadcast
    while session_a.remotes().get(&b_id).is_none() {
        let msg = recv(&mut a).await;
        session_a.on_message(msg);
    }

    let Some(ClientMsg::PlayerMove(update)) = session_a.tick(InputState {
        right: true,
        ..InputState::default()
    }) else {
        panic!("local tick produced no playerMove");
    };
    send(&mut a, &ClientMsg::PlayerMove(update.clone())).await;

    loop {
        let msg = recv(&mut b).await;
        let done = msg == ServerMsg::PlayerMove(update.clone());
        session_b.on_message(msg);
        if done {
            break;
        }
    }

    let mirror = session_b.remotes().get(&a_id).unwrap();
    assert_eq!(mirror.position(session_b.world()), (update.x, update.y));
}
