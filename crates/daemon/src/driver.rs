// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver orchestrator: startup, the engine loop, routing, shutdown.
//!
//! One task owns the [`World`]; connection I/O tasks and the watcher
//! only emit events. Every entry point from the network into mudlib
//! code contains failures: log with the actor, offer the error to the
//! master object, keep the connection.

use crate::builtins;
use crate::env;
use crate::handlers::login::LoginDaemon;
use crate::handlers::{oob, session};
use crate::listener;
use crate::master::MasterPolicy;
use crate::watcher::MudlibWatcher;
use loam_core::{
    ConnectionId, Event, MudConfig, ObjectId, SystemClock, TimerId, VirtualPath,
};
use loam_engine::{
    ActorContext, BoundHandler, CalloutPayload, CommandBody, EfunError, PermissionStore,
    Resolution, World,
};
use loam_mudlib::Action;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Orchestrator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Startup/shutdown errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("driver can only start from stopped (currently {0:?})")]
    NotStopped(DriverState),

    #[error("driver is not running (currently {0:?})")]
    NotRunning(DriverState),

    #[error("failed to bind port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("master object: {0}")]
    Master(EfunError),

    #[error("permissions snapshot: {0}")]
    Permissions(#[from] loam_storage::StoreError),

    #[error("mudlib watcher: {0}")]
    Watcher(#[from] notify::Error),
}

/// The driver process state.
pub struct Driver {
    pub world: World<SystemClock>,
    pub(crate) login: LoginDaemon,
    pub(crate) master: Option<MasterPolicy>,
    state: DriverState,
    event_tx: mpsc::UnboundedSender<Event>,
    event_rx: mpsc::UnboundedReceiver<Event>,
    listener: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    watcher: Option<MudlibWatcher>,
    /// Preload failures recorded (not propagated) during startup.
    pub preload_failures: Vec<(VirtualPath, String)>,
}

impl Driver {
    pub fn new(config: MudConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            world: World::new(config, SystemClock),
            login: LoginDaemon::new(),
            master: None,
            state: DriverState::Stopped,
            event_tx,
            event_rx,
            listener: None,
            local_addr: None,
            watcher: None,
            preload_failures: Vec::new(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Sender for external event injection (signal handlers, tests).
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.event_tx.clone()
    }

    /// Bound listen address, once started. Port 0 in the config gets an
    /// ephemeral port; this is where to find it.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    // ---------------------------------------------------------------
    // Startup
    // ---------------------------------------------------------------

    /// Bring the driver up. Order matters and is fixed:
    /// registry/scheduler (built with the world), master, preloads,
    /// login daemon, command manager, permissions, scheduler timers,
    /// watcher, then the listener, and only then `running`.
    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state != DriverState::Stopped {
            return Err(LifecycleError::NotStopped(self.state));
        }
        self.state = DriverState::Starting;

        // 2. Master object and its policy surface.
        let master = match MasterPolicy::load(&mut self.world) {
            Ok(master) => master,
            Err(e) => {
                self.state = DriverState::Stopped;
                return Err(LifecycleError::Master(e));
            }
        };

        // 3. Preloads; per-item failures are recorded, never fatal.
        for path in master.preload().to_vec() {
            if let Err(e) = self.world.load_object(&path) {
                warn!(%path, error = %e, "preload failed");
                self.preload_failures.push((path, e.to_string()));
            }
        }
        self.master = Some(master);

        // 4. Login daemon; the session authority for new connections.
        self.login = LoginDaemon::new();

        // 5. Command manager: built-ins, mudlib commands, the soul.
        builtins::register_all(&mut self.world.commands);
        self.scan_mudlib_commands();

        // 6. Permissions snapshot.
        let snapshot = loam_storage::load_permissions(&self.world.store)?;
        self.world.permissions = PermissionStore::from_file(snapshot);

        // 7. Recurring driver timers.
        self.arm_reset_timer();
        self.arm_audit_timer();

        // 8. Hot-reload watcher.
        if self.world.config.hot_reload {
            let watcher = MudlibWatcher::start(self.world.loader.root(), self.event_tx.clone())?;
            self.watcher = Some(watcher);
        }

        // Listener last: no peer gets in before the world is ready.
        let port = self.world.config.port;
        let tcp = TcpListener::bind(("0.0.0.0", port))
            .await
            .map_err(|source| {
                self.state = DriverState::Stopped;
                LifecycleError::BindFailed { port, source }
            })?;
        self.local_addr = tcp.local_addr().ok();
        self.listener = Some(tcp);

        self.state = DriverState::Running;
        info!(addr = ?self.local_addr, "driver running");
        Ok(())
    }

    fn scan_mudlib_commands(&mut self) {
        for dir in ["/cmds", "/soul"] {
            let Ok(dir) = VirtualPath::new(dir) else {
                continue;
            };
            if dir.as_str() == "/cmds" {
                let (defs, failures) = self.world.loader.scan_commands(&dir);
                for def in defs {
                    self.world.commands.register_mudlib(def);
                }
                for (path, e) in failures {
                    warn!(%path, error = %e, "command file skipped");
                }
            } else {
                let (defs, failures) = self.world.loader.scan_emotes(&dir);
                self.world.commands.register_emotes(defs);
                for (path, e) in failures {
                    warn!(%path, error = %e, "emote file skipped");
                }
            }
        }
        info!(
            commands = self.world.commands.command_count(),
            emotes = self.world.commands.emote_count(),
            "command manager ready"
        );
    }

    fn arm_reset_timer(&mut self) {
        let interval = Duration::from_secs(self.world.config.reset_interval_minutes * 60);
        let now = self.world.now();
        self.world
            .scheduler
            .set_timer(TimerId::reset_cycle(), interval, now);
    }

    fn arm_audit_timer(&mut self) {
        let now = self.world.now();
        self.world
            .scheduler
            .set_timer(TimerId::audit_flush(), Duration::from_secs(60), now);
    }

    // ---------------------------------------------------------------
    // Engine loop
    // ---------------------------------------------------------------

    /// Run until a shutdown event arrives, then stop cleanly.
    pub async fn run(&mut self) -> Result<(), LifecycleError> {
        if self.state != DriverState::Running {
            return Err(LifecycleError::NotRunning(self.state));
        }
        let listener = self
            .listener
            .take()
            .ok_or(LifecycleError::NotRunning(self.state))?;

        // The loop owns its inputs; handlers borrow `self` freely.
        let (_keep_alive, placeholder) = mpsc::unbounded_channel();
        let mut event_rx = std::mem::replace(&mut self.event_rx, placeholder);

        // NOTE: intervals are created outside the loop; select!
        // re-evaluates branches each iteration and a fresh sleep would
        // never fire under load.
        let mut timer_check = tokio::time::interval(env::tick_interval());
        let mut heartbeat = tokio::time::interval(Duration::from_millis(
            self.world.config.heartbeat_interval_ms,
        ));

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => self.accept_connection(stream, remote),
                    Err(e) => error!(error = %e, "accept failed"),
                },

                maybe = event_rx.recv() => match maybe {
                    Some(Event::Shutdown) => {
                        info!("shutdown requested");
                        break;
                    }
                    Some(event) => self.handle_event(event),
                    None => break,
                },

                _ = timer_check.tick() => self.fire_timers(),

                _ = heartbeat.tick() => {
                    self.world.run_heartbeats();
                }
            }
        }

        self.event_rx = event_rx;
        drop(listener);
        self.stop();
        Ok(())
    }

    fn accept_connection(&mut self, stream: tokio::net::TcpStream, remote: SocketAddr) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let conn = self
            .world
            .connections
            .register(remote, out_tx, self.world.config.replay.buffer);
        listener::spawn_io(conn, stream, out_rx, self.event_tx.clone());
        self.login.greet(&mut self.world, conn);
        info!(%conn, %remote, "connection accepted");
    }

    // ---------------------------------------------------------------
    // Event handling
    // ---------------------------------------------------------------

    /// Process one event. Public so the workspace spec suite can drive
    /// a driver without sockets.
    pub fn handle_event(&mut self, event: Event) {
        debug!(event = %event.log_summary(), "event");
        match event {
            Event::Line { conn, line } => self.route_line(conn, line),
            Event::Oob { conn, envelope } => oob::route(self, conn, envelope),
            Event::OobInvalid { conn, error } => {
                warn!(%conn, error, "malformed OOB frame");
            }
            Event::Closed { conn } => session::handle_disconnect(self, conn),
            Event::SourceModified { path } => self.source_modified(path),
            Event::SourceRemoved { path } => self.source_removed(path),
            Event::Shutdown => {
                // run() intercepts this; arriving here means an
                // out-of-loop caller, which is a no-op.
            }
        }
    }

    /// Input routing: OOB frames were split off in the connection task;
    /// plain lines go to the login daemon or the bound player.
    fn route_line(&mut self, conn: ConnectionId, line: String) {
        let handler = match self.world.connections.get(conn) {
            Some(handle) => handle.handler,
            None => return,
        };
        match handler {
            BoundHandler::Login => {
                if let Some((record, fresh)) = self.login.handle_line(&mut self.world, conn, &line)
                {
                    session::bind_player(self, conn, record, fresh);
                }
            }
            BoundHandler::Player(player) => {
                self.world.context.push(ActorContext::for_player(player));
                let result = self.dispatch_player_input(player, &line);
                self.world.context.pop();
                if let Err(e) = result {
                    self.contain_error(player, &e);
                }
            }
        }
    }

    /// The player's `processInput`: alias resolution → verb lookup →
    /// permission gate → social fallback.
    fn dispatch_player_input(&mut self, player: ObjectId, line: &str) -> Result<(), EfunError> {
        enum Dispatch {
            Builtin(&'static str, String),
            Actions(Vec<Action>, String),
            Denied,
            Emote(loam_mudlib::EmoteDef, String),
            Unknown,
            Empty,
        }

        let dispatch = {
            let Some(entry) = self.world.players.get_by_object(player) else {
                return Ok(());
            };
            let level = entry.level;
            let aliases = entry.aliases.clone();
            match self.world.commands.resolve(line, level, &aliases) {
                Resolution::Command { spec, args } => match &spec.body {
                    CommandBody::Builtin(key) => Dispatch::Builtin(*key, args),
                    CommandBody::Actions(actions) => Dispatch::Actions(actions.clone(), args),
                },
                Resolution::Denied { .. } => Dispatch::Denied,
                Resolution::Emote { emote, args } => Dispatch::Emote(emote.clone(), args),
                Resolution::Unknown { .. } => Dispatch::Unknown,
                Resolution::Empty => Dispatch::Empty,
            }
        };

        match dispatch {
            Dispatch::Builtin(key, args) => {
                let outcome = builtins::execute(&mut self.world, key, player, &args)?;
                if outcome.shutdown {
                    let _ = self.event_tx.send(Event::Shutdown);
                }
                Ok(())
            }
            Dispatch::Actions(actions, args) => {
                let extra = [("args", args)];
                self.world.run_actions(player, &actions, &extra)
            }
            Dispatch::Denied => {
                self.world.send(player, "You can't do that.");
                Ok(())
            }
            Dispatch::Emote(emote, args) => {
                builtins::perform_emote(&mut self.world, player, &emote, &args);
                Ok(())
            }
            Dispatch::Unknown => {
                self.world.send(player, "What?");
                Ok(())
            }
            Dispatch::Empty => Ok(()),
        }
    }

    /// Error containment at the network boundary: log with the actor,
    /// offer the failure to the master, keep serving. Only `Fatal`
    /// moves the driver toward stopping.
    fn contain_error(&mut self, player: ObjectId, error: &EfunError) {
        warn!(actor = %player, kind = error.kind(), error = %error, "player input failed");
        if let Some(master) = &self.master {
            master.report_error(&mut self.world, &player.to_string(), error);
        }
        self.world
            .send(player, &format!("Something went wrong: {error}"));
        if error.is_fatal() {
            error!("fatal driver error, shutting down");
            let _ = self.event_tx.send(Event::Shutdown);
        }
    }

    // ---------------------------------------------------------------
    // Timers
    // ---------------------------------------------------------------

    /// Fire everything due. Call-outs run under an object context;
    /// named timers dispatch driver behavior.
    pub fn fire_timers(&mut self) {
        let now = self.world.now();
        for fired in self.world.scheduler.fired(now) {
            match fired.payload {
                CalloutPayload::Script { target, actions } => {
                    if !self.world.registry.contains(target) {
                        continue;
                    }
                    self.world.context.push(ActorContext::for_object(target));
                    let result = self.world.run_actions(target, &actions, &[]);
                    self.world.context.pop();
                    if let Err(e) = result {
                        warn!(%target, error = %e, "call-out failed");
                        if let Some(master) = &self.master {
                            master.report_error(&mut self.world, &target.to_string(), &e);
                        }
                    }
                }
                CalloutPayload::Timer(id) => self.fire_named_timer(id),
            }
        }
    }

    fn fire_named_timer(&mut self, id: TimerId) {
        if let Some(player_key) = id.disconnect_player().map(str::to_string) {
            session::limbo_expired(self, &player_key);
        } else if id == TimerId::reset_cycle() {
            let ran = self.world.run_resets();
            debug!(ran, "reset cycle");
            self.arm_reset_timer();
        } else if id == TimerId::audit_flush() {
            self.flush_permissions();
            let now_ms = self.world.epoch_ms();
            self.world.sessions.prune_expired(now_ms);
            self.arm_audit_timer();
        } else {
            warn!(%id, "unknown driver timer");
        }
    }

    fn flush_permissions(&mut self) {
        if self.world.permissions.take_dirty() {
            let file = self.world.permissions.to_file();
            if let Err(e) = loam_storage::save_permissions(&self.world.store, &file) {
                warn!(error = %e, "permissions flush failed");
            }
        }
    }

    // ---------------------------------------------------------------
    // Hot reload
    // ---------------------------------------------------------------

    /// Modification marks only; the change lands when a privileged
    /// user runs `update`.
    fn source_modified(&mut self, path: VirtualPath) {
        if self.world.registry.lookup_blueprint(&path).is_some()
            && self.world.stale_sources.insert(path.clone())
        {
            info!(%path, "source modified; blueprint marked stale");
        }
    }

    /// Deletion destroys live clones and drops the blueprint, except
    /// for safelisted paths.
    fn source_removed(&mut self, path: VirtualPath) {
        let safelisted = self
            .master
            .as_ref()
            .is_some_and(|master| master.is_safelisted(&path));
        if safelisted {
            info!(%path, "source removed but safelisted; clones kept");
            return;
        }
        if self.world.registry.lookup_blueprint(&path).is_none() {
            return;
        }
        let clones = self.world.registry.clones_of(&path);
        for id in &clones {
            if let Err(e) = self.world.destruct(*id, true) {
                warn!(%id, error = %e, "destroy on source removal failed");
            }
        }
        self.world.registry.unregister_blueprint(&path);
        self.world.stale_sources.remove(&path);
        info!(%path, clones = clones.len(), "source removed; blueprint retired");
    }

    // ---------------------------------------------------------------
    // Shutdown
    // ---------------------------------------------------------------

    /// Tear down in reverse startup order. Master's shutdown hook runs
    /// first; the scheduler is cleared last.
    pub fn stop(&mut self) {
        if self.state == DriverState::Stopped {
            return;
        }
        self.state = DriverState::Stopping;
        info!("driver stopping");

        if let Some(master) = self.master.take() {
            master.on_shutdown(&mut self.world);
        }

        // Save and retire every active player, LIMBO included; their
        // pending disconnect call-outs die with the scheduler clear.
        let names: Vec<String> = self
            .world
            .players
            .iter()
            .map(|entry| entry.name.clone())
            .collect();
        for name in names {
            let Some(entry) = self.world.players.get(&name) else {
                continue;
            };
            let player = entry.object;
            let conn = entry.connection;
            if let Err(e) = self.world.save_player(player) {
                warn!(player = %name, error = %e, "shutdown save failed");
            }
            if let Some(conn) = conn {
                self.world
                    .tell_connection(conn, "The world is closing down. Farewell.");
                if let Some(handle) = self.world.connections.get(conn) {
                    handle.close();
                }
            }
            let _ = self.world.destruct(player, true);
        }

        self.watcher = None;
        self.flush_permissions();
        self.world.scheduler.clear();
        self.world.context.clear();

        self.state = DriverState::Stopped;
        info!("driver stopped");
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
