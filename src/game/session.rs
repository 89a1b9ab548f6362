//! Client-side session: local frame loop plus remote mirrors

use rand::Rng;
use tracing::{debug, info};

use crate::util::time::{frame_delta, CLIENT_FPS};
use crate::ws::protocol::{ClientMsg, ConnectionId, PlayerDescriptor, PlayerSpawn, ServerMsg};

use super::ground::{Ground, GROUND_HEIGHT};
use super::mirror::RemotePlayers;
use super::physics::PhysicsWorld;
use super::player::{Player, PLAYER_SIZE};
use super::render::Surface;

/// Keys held during one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

/// Session parameters
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub canvas_width: f32,
    pub canvas_height: f32,
    pub fps: u32,
    /// Engine gravity in px/s²; players also fall through `Player::update`
    pub engine_gravity: f32,
    pub color: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            fps: CLIENT_FPS,
            engine_gravity: 0.0,
            color: "#eeeeee".to_string(),
        }
    }
}

/// `#rrggbb` with uniformly random channels
pub fn random_hex_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06x}", rng.gen_range(0..=0xff_ffffu32))
}

/// One client's view of the game: its own simulated player, the ground and
/// a mirror per remote participant.
pub struct ClientSession {
    world: PhysicsWorld,
    ground: Ground,
    local_id: Option<ConnectionId>,
    local: Option<Player>,
    remotes: RemotePlayers,
    canvas_width: f32,
    canvas_height: f32,
    color: String,
}

impl ClientSession {
    pub fn new(config: SessionConfig) -> Self {
        let mut world = PhysicsWorld::new(config.engine_gravity, frame_delta(config.fps));
        let ground = Ground::for_canvas(&mut world, config.canvas_width, config.canvas_height);

        Self {
            world,
            ground,
            local_id: None,
            local: None,
            remotes: RemotePlayers::new(),
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
            color: config.color,
        }
    }

    /// Apply one relayed event; returns messages to send back
    pub fn on_message(&mut self, msg: ServerMsg) -> Vec<ClientMsg> {
        match msg {
            ServerMsg::Welcome(welcome) => self.on_welcome(welcome.id),
            ServerMsg::PlayerConnected(descriptor) => {
                self.remotes.on_connected(
                    &mut self.world,
                    &descriptor,
                    self.local_id,
                    self.canvas_width,
                );
                Vec::new()
            }
            ServerMsg::PlayerMove(update)
            | ServerMsg::PlayerPosition(update)
            | ServerMsg::PlayerJump(update) => {
                self.remotes
                    .on_transform(&mut self.world, &update, self.local_id);
                Vec::new()
            }
            ServerMsg::PlayerDisconnected(id) => {
                self.remotes.on_disconnected(&mut self.world, &id);
                Vec::new()
            }
        }
    }

    /// Advance one frame. Returns the local player's transform to emit:
    /// `playerJump` on the frame a jump fires, `playerMove` otherwise.
    pub fn tick(&mut self, input: InputState) -> Option<ClientMsg> {
        let Some(local) = self.local.as_mut() else {
            self.world.step();
            return None;
        };

        if input.left {
            local.move_left(&mut self.world);
        }
        if input.right {
            local.move_right(&mut self.world);
        }
        let jumped = input.jump && local.jump(&mut self.world);

        local.update(&mut self.world, &self.ground);
        self.world.step();

        let update = local.position_update(&self.world);
        Some(if jumped {
            ClientMsg::PlayerJump(update)
        } else {
            ClientMsg::PlayerMove(update)
        })
    }

    /// Canvas changed size: refit the ground and the wrap width
    pub fn resize(&mut self, canvas_width: f32, canvas_height: f32) {
        self.ground.resize(
            &mut self.world,
            canvas_width / 2.0,
            canvas_height - GROUND_HEIGHT / 2.0,
            canvas_width,
            GROUND_HEIGHT,
        );

        if let Some(local) = self.local.as_mut() {
            local.canvas_width = canvas_width;
        }
        self.remotes.set_canvas_width(canvas_width);

        self.canvas_width = canvas_width;
        self.canvas_height = canvas_height;
    }

    /// Draw every player, local first
    pub fn draw(&self, surface: &mut dyn Surface) {
        if let Some(local) = &self.local {
            local.draw(&self.world, surface);
        }
        for remote in self.remotes.iter() {
            remote.draw(&self.world, surface);
        }
    }

    pub fn local_id(&self) -> Option<ConnectionId> {
        self.local_id
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.local.as_ref()
    }

    pub fn local_player_mut(&mut self) -> Option<&mut Player> {
        self.local.as_mut()
    }

    pub fn remotes(&self) -> &RemotePlayers {
        &self.remotes
    }

    pub fn ground(&self) -> &Ground {
        &self.ground
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    fn on_welcome(&mut self, id: ConnectionId) -> Vec<ClientMsg> {
        // A second welcome means a fresh connection: start over, the roster
        // replay repopulates the mirrors
        if let Some(previous) = self.local.take() {
            debug!(previous = %previous.id, "Replacing local player");
            previous.despawn(&mut self.world);
            self.remotes.clear(&mut self.world);
        }

        let descriptor = PlayerDescriptor {
            id,
            x: self.canvas_width / 2.0,
            y: self.canvas_height / 2.0,
            width: PLAYER_SIZE,
            height: PLAYER_SIZE,
            angle: 0.0,
            color: self.color.clone(),
        };

        let player = Player::spawn(&mut self.world, &descriptor, self.canvas_width);
        info!(id = %id, color = %self.color, "Local player spawned");
        let announce = PlayerSpawn::from(&player.descriptor(&self.world));

        self.local_id = Some(id);
        self.local = Some(player);

        vec![ClientMsg::ShowPlayers, ClientMsg::NewPlayer(announce)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::render::RecordingSurface;
    use crate::ws::protocol::{PositionUpdate, Welcome};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use uuid::Uuid;

    fn welcomed() -> (ClientSession, ConnectionId) {
        let mut session = ClientSession::new(SessionConfig::default());
        let id = Uuid::new_v4();
        session.on_message(ServerMsg::Welcome(Welcome { id, server_time: 0 }));
        (session, id)
    }

    fn remote(id: ConnectionId, x: f32) -> ServerMsg {
        ServerMsg::PlayerConnected(PlayerDescriptor {
            id,
            x,
            y: 100.0,
            width: 40.0,
            height: 40.0,
            angle: 0.0,
            color: "#0000ff".to_string(),
        })
    }

    #[test]
    fn no_output_before_welcome() {
        let mut session = ClientSession::new(SessionConfig::default());
        assert_eq!(session.tick(InputState::default()), None);
        assert!(session.local_player().is_none());
    }

    #[test]
    fn welcome_spawns_local_player_and_announces_it() {
        let mut session = ClientSession::new(SessionConfig {
            color: "#abcdef".to_string(),
            ..SessionConfig::default()
        });
        let id = Uuid::new_v4();

        let out = session.on_message(ServerMsg::Welcome(Welcome { id, server_time: 0 }));

        assert_eq!(session.local_id(), Some(id));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], ClientMsg::ShowPlayers);
        match &out[1] {
            ClientMsg::NewPlayer(spawn) => {
                assert_eq!((spawn.x, spawn.y), (400.0, 300.0));
                assert_eq!((spawn.width, spawn.height), (PLAYER_SIZE, PLAYER_SIZE));
                assert_eq!(spawn.color, "#abcdef");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn tick_emits_local_transform() {
        let (mut session, id) = welcomed();

        match session.tick(InputState::default()) {
            Some(ClientMsg::PlayerMove(update)) => {
                assert_eq!(update.id, id);
                assert!(update.angle.is_some());
            }
            other => panic!("unexpected tick output: {:?}", other),
        }
    }

    #[test]
    fn local_player_falls_onto_the_floor() {
        let (mut session, _) = welcomed();

        for _ in 0..600 {
            session.tick(InputState::default());
        }

        let (_, y) = session.local_player().unwrap().position(session.world());
        // Floor top edge is at 600 - 80; the player is 40 tall
        assert!(y > 400.0 && y < 520.0, "y = {}", y);
    }

    #[test]
    fn jump_fires_only_after_landing() {
        let (mut session, _) = welcomed();
        let hold_jump = InputState {
            jump: true,
            ..InputState::default()
        };

        // Spawned mid-air: holding jump does nothing until the floor is reached
        let mut jumped_at = None;
        for frame in 0..600 {
            if let Some(ClientMsg::PlayerJump(update)) = session.tick(hold_jump) {
                jumped_at = Some((frame, update.y));
                break;
            }
        }

        let (frame, y) = jumped_at.expect("player never landed");
        assert!(frame > 10, "jumped on frame {}", frame);
        assert!(y > 400.0, "jumped at y = {}", y);
        let local = session.local_player().unwrap();
        assert!(local.velocity(session.world()).1 < 0.0);
    }

    #[test]
    fn jump_latch_clears_when_leaving_the_floor() {
        let (mut session, _) = welcomed();
        session.tick(InputState::default());
        session.local_player_mut().unwrap().is_grounded = true;
        let hold_jump = InputState {
            jump: true,
            ..InputState::default()
        };

        let out = session.tick(hold_jump);
        assert!(matches!(out, Some(ClientMsg::PlayerJump(_))));

        // Mid-air: the update recomputed the latch from the overlap test
        let next = session.tick(hold_jump);
        assert!(matches!(next, Some(ClientMsg::PlayerMove(_))));
    }

    #[test]
    fn own_echo_does_not_move_local_player() {
        let (mut session, id) = welcomed();
        let before = session.local_player().unwrap().position(session.world());

        session.on_message(ServerMsg::PlayerMove(PositionUpdate {
            id,
            x: 1.0,
            y: 1.0,
            angle: Some(0.0),
        }));

        assert_eq!(session.local_player().unwrap().position(session.world()), before);
    }

    #[test]
    fn relayed_events_drive_mirrors() {
        let (mut session, id) = welcomed();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        session.on_message(remote(a, 100.0));
        session.on_message(remote(b, 700.0));
        session.on_message(remote(id, 400.0));
        assert_eq!(session.remotes().len(), 2);

        session.on_message(ServerMsg::PlayerPosition(PositionUpdate {
            id: a,
            x: 150.0,
            y: 120.0,
            angle: None,
        }));
        let world = session.world();
        assert_eq!(session.remotes().get(&a).unwrap().position(world), (150.0, 120.0));
        assert_eq!(session.remotes().get(&b).unwrap().position(world), (700.0, 100.0));

        session.on_message(ServerMsg::PlayerDisconnected(a));
        assert!(session.remotes().get(&a).is_none());
        assert_eq!(session.remotes().len(), 1);
    }

    #[test]
    fn resize_refits_ground_and_wrap_width() {
        let (mut session, _) = welcomed();
        session.on_message(remote(Uuid::new_v4(), 100.0));

        session.resize(1600.0, 900.0);

        assert_eq!(session.ground().width, 1600.0);
        assert_eq!(session.ground().y, 900.0 - GROUND_HEIGHT / 2.0);
        assert_eq!(session.local_player().unwrap().canvas_width, 1600.0);
        assert!(session.remotes().iter().all(|p| p.canvas_width == 1600.0));
    }

    #[test]
    fn second_welcome_starts_over() {
        let (mut session, _) = welcomed();
        session.on_message(remote(Uuid::new_v4(), 100.0));
        let new_id = Uuid::new_v4();

        session.on_message(ServerMsg::Welcome(Welcome {
            id: new_id,
            server_time: 0,
        }));

        assert_eq!(session.local_id(), Some(new_id));
        assert!(session.remotes().is_empty());
        assert_eq!(session.world().bodies.len(), 1);
    }

    #[test]
    fn draw_covers_local_and_remotes() {
        let (mut session, _) = welcomed();
        session.on_message(remote(Uuid::new_v4(), 100.0));
        let mut surface = RecordingSurface::default();

        session.draw(&mut surface);

        assert_eq!(surface.calls.len(), 2);
    }

    #[test]
    fn random_colors_are_css_hex() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let color = random_hex_color(&mut rng);
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
