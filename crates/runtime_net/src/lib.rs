use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
    mpsc::{Receiver, Sender},
};
use std::thread::{self, JoinHandle};

use bus::{CoreCommand, CoreEvent};
use core_types::RequestId;
use net::{NetConfig, NetError, build_agent, fetch};

type CancelMap = Arc<Mutex<HashMap<RequestId, Arc<AtomicBool>>>>;

/// Spawns the network runtime. Each `Fetch` runs on its own worker thread; the runtime
/// exits once every command sender is dropped.
pub fn start_net_runtime(
    cmd_rx: Receiver<CoreCommand>,
    evt_tx: Sender<CoreEvent>,
    config: NetConfig,
) -> Result<JoinHandle<()>, NetError> {
    let agent = build_agent(&config)?;
    let config = Arc::new(config);

    Ok(thread::spawn(move || {
        // one cancel flag per in-flight request_id
        let cancels: CancelMap = Arc::new(Mutex::new(HashMap::new()));

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                CoreCommand::Fetch {
                    request_id,
                    kind,
                    request,
                } => {
                    let cancel = Arc::new(AtomicBool::new(false));
                    if let Ok(mut map) = cancels.lock() {
                        map.insert(request_id, cancel.clone());
                    }

                    let agent = agent.clone();
                    let config = config.clone();
                    let cancels = cancels.clone();
                    let evt_tx = evt_tx.clone();
                    thread::spawn(move || {
                        log::trace!(target: "runtime_net", "start {} #{request_id} {}", kind.as_str(), request.url);
                        let evt = match fetch(&agent, &config, &request, &cancel) {
                            Ok(response) => CoreEvent::NetworkDone {
                                request_id,
                                kind,
                                response,
                            },
                            Err(err) => CoreEvent::NetworkError {
                                request_id,
                                kind,
                                url: request.url.clone(),
                                cancelled: matches!(err, NetError::Cancelled),
                                error: err.to_string(),
                            },
                        };
                        if let Ok(mut map) = cancels.lock() {
                            map.remove(&request_id);
                        }
                        // Receiver gone means the router shut down.
                        let _ = evt_tx.send(evt);
                    });
                }

                CoreCommand::CancelRequest { request_id } => {
                    let flag = cancels.lock().ok().and_then(|map| map.get(&request_id).cloned());
                    if let Some(flag) = flag {
                        log::trace!(target: "runtime_net", "cancel #{request_id}");
                        flag.store(true, Ordering::Release);
                    }
                }
            }
        }
        log::trace!(target: "runtime_net", "command channel closed, stopping");
    }))
}
