//! Lifespan state machine.
//!
//! ```text
//! WaitingStartup -> StartupRunning -> StartupFailed
//!                                  -> WaitingShutdown -> ShutdownRunning -> ShutdownFailed
//!                                                                        -> Terminated
//! ```
//!
//! Startup hooks run one after another against the process-wide state; the
//! first fault stops them and is reported as `<kind>: <detail>`. When every
//! hook succeeds the route table is compiled, once, and requests are served.
//! Shutdown hooks run the same way; a fault is reported but the machine
//! still terminates. A shutdown that arrives before any startup is accepted.

use crate::handler::SharedLifespanHook;
use crate::host::{LifespanChannel, LifespanEvent, LifespanReply};
use crate::{App, Error, Fault};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifespanPhase {
    WaitingStartup,
    StartupRunning,
    StartupFailed,
    WaitingShutdown,
    ShutdownRunning,
    ShutdownFailed,
    Terminated,
}

impl LifespanPhase {
    /// No further lifespan events will be handled.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            LifespanPhase::StartupFailed | LifespanPhase::ShutdownFailed | LifespanPhase::Terminated
        )
    }

    /// Startup completed and shutdown has not begun.
    pub fn is_serving(&self) -> bool {
        *self == LifespanPhase::WaitingShutdown
    }
}

impl App {
    /// Drive the lifespan conversation until it ends.
    ///
    /// Returns the final phase once startup fails, shutdown finishes, or the
    /// host stops sending events. A second startup or shutdown signal is a
    /// protocol error.
    pub async fn run_lifespan<C>(&self, channel: &mut C) -> Result<LifespanPhase, Error>
    where
        C: LifespanChannel + ?Sized,
    {
        while let Some(event) = channel.receive().await {
            debug!(?event, phase = ?self.phase(), "lifespan event");
            let reply = match event {
                LifespanEvent::Startup => self.startup().await?,
                LifespanEvent::Shutdown => self.shutdown().await?,
            };
            channel.send(reply).await?;

            let phase = self.phase();
            if phase.is_final() {
                return Ok(phase);
            }
        }

        debug!("lifespan channel closed");
        Ok(self.phase())
    }

    /// Run the startup hooks and compile the routes.
    pub async fn startup(&self) -> Result<LifespanReply, Error> {
        self.transition(LifespanEvent::Startup)?;
        info!(hooks = self.startup.len(), "application starting");

        let mut state = self.state();
        let outcome = run_hooks(&self.startup, &mut state).await;
        *self.state.write() = state;

        if let Err(fault) = outcome {
            error!(%fault, "startup hook failed");
            self.set_phase(LifespanPhase::StartupFailed);
            return Ok(LifespanReply::StartupFailed {
                message: fault.to_string(),
            });
        }

        let compiled = match self.routes.compile() {
            Ok(compiled) => compiled,
            Err(err) => {
                error!(error = %err, "route compilation failed");
                self.set_phase(LifespanPhase::StartupFailed);
                return Ok(LifespanReply::StartupFailed {
                    message: format!("{}: {}", err.kind(), err),
                });
            }
        };
        // Startup runs at most once, so the cell is always empty here.
        let _ = self.compiled.set(compiled);

        self.set_phase(LifespanPhase::WaitingShutdown);
        info!(routes = self.routes.len(), "application started");
        Ok(LifespanReply::StartupComplete)
    }

    /// Run the shutdown hooks.
    pub async fn shutdown(&self) -> Result<LifespanReply, Error> {
        self.transition(LifespanEvent::Shutdown)?;
        info!(hooks = self.shutdown.len(), "application shutting down");

        let mut state = self.state();
        let outcome = run_hooks(&self.shutdown, &mut state).await;
        *self.state.write() = state;

        match outcome {
            Ok(()) => {
                self.set_phase(LifespanPhase::Terminated);
                info!("application stopped");
                Ok(LifespanReply::ShutdownComplete)
            }
            Err(fault) => {
                error!(%fault, "shutdown hook failed");
                self.set_phase(LifespanPhase::ShutdownFailed);
                Ok(LifespanReply::ShutdownFailed {
                    message: fault.to_string(),
                })
            }
        }
    }

    fn transition(&self, event: LifespanEvent) -> Result<(), Error> {
        let mut phase = self.phase.lock();
        let next = match (event, *phase) {
            (LifespanEvent::Startup, LifespanPhase::WaitingStartup) => LifespanPhase::StartupRunning,
            (
                LifespanEvent::Shutdown,
                LifespanPhase::WaitingStartup | LifespanPhase::WaitingShutdown,
            ) => LifespanPhase::ShutdownRunning,
            (event, current) => {
                return Err(Error::Protocol(format!(
                    "unexpected {:?} signal while {:?}",
                    event, current
                )));
            }
        };
        *phase = next;
        Ok(())
    }

    fn set_phase(&self, next: LifespanPhase) {
        *self.phase.lock() = next;
    }
}

async fn run_hooks(hooks: &[SharedLifespanHook], state: &mut crate::State) -> Result<(), Fault> {
    for hook in hooks {
        hook.call(state).await?;
    }
    Ok(())
}
