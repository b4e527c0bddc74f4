//! Single-writer access to a [`Game`] from async code.
//!
//! The game lives inside one tokio task; handles send requests over an mpsc
//! channel and wait on a oneshot reply. Requests are processed strictly one
//! at a time, in arrival order.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::GameConfig;
use crate::engine::reducer::{Op, ReducerOutput};
use crate::engine::{Game, GameSnapshot};
use crate::error::{GameError, GameResult};
use crate::logging::{self, Domain, Level};
use crate::types::{Address, Amount};

const QUEUE_DEPTH: usize = 64;

enum Request {
    Execute {
        caller: Address,
        op: Op,
        reply: oneshot::Sender<GameResult<ReducerOutput>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },
    DeployChild {
        deployer: Address,
        config: GameConfig,
        funding: Amount,
        reply: oneshot::Sender<GameResult<Game>>,
    },
    Stop {
        reply: oneshot::Sender<Game>,
    },
}

pub struct GameService {
    game: Game,
    rx: mpsc::Receiver<Request>,
}

/// Cheap to clone; every clone talks to the same instance.
#[derive(Clone)]
pub struct GameHandle {
    tx: mpsc::Sender<Request>,
}

impl GameService {
    /// Moves `game` into a background task.
    pub fn spawn(game: Game) -> (GameHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let service = GameService { game, rx };
        let task = tokio::spawn(service.run());
        (GameHandle { tx }, task)
    }

    async fn run(mut self) {
        let address = self.game.address();
        logging::log(
            Level::Info,
            Domain::System,
            "service_started",
            logging::obj(&[("instance", logging::v_addr(&address))]),
        );
        while let Some(req) = self.rx.recv().await {
            match req {
                Request::Execute { caller, op, reply } => {
                    let _ = reply.send(self.game.execute(caller, op));
                }
                Request::Snapshot { reply } => {
                    let _ = reply.send(self.game.snapshot());
                }
                Request::DeployChild { deployer, config, funding, reply } => {
                    let result = self.game.deploy_child(deployer, config, funding);
                    // the parent already recorded the child; leave a trace of it
                    if let Err(Ok(child)) = reply.send(result) {
                        logging::log_child_abandoned(&address, &child.address());
                    }
                }
                Request::Stop { reply } => {
                    let _ = reply.send(self.game);
                    logging::log(
                        Level::Info,
                        Domain::System,
                        "service_stopped",
                        logging::obj(&[("instance", logging::v_addr(&address))]),
                    );
                    return;
                }
            }
        }
    }
}

impl GameHandle {
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Request) -> GameResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).await.map_err(|_| GameError::ServiceStopped)?;
        rx.await.map_err(|_| GameError::ServiceStopped)
    }

    pub async fn execute(&self, caller: Address, op: Op) -> GameResult<ReducerOutput> {
        self.request(|reply| Request::Execute { caller, op, reply }).await?
    }

    pub async fn contribute(&self, sender: Address, amount: Amount) -> GameResult<ReducerOutput> {
        self.execute(sender, Op::Contribute { amount }).await
    }

    pub async fn snapshot(&self) -> GameResult<GameSnapshot> {
        self.request(|reply| Request::Snapshot { reply }).await
    }

    pub async fn deploy_child(&self, deployer: Address, config: GameConfig, funding: Amount) -> GameResult<Game> {
        self.request(|reply| Request::DeployChild { deployer, config, funding, reply }).await?
    }

    /// Ends the service and returns the instance. Other handles get `ServiceStopped` afterwards.
    pub async fn stop(&self) -> GameResult<Game> {
        self.request(|reply| Request::Stop { reply }).await
    }
}
