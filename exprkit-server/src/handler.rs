//! Request handler for exprkit-server

use exprkit_core::protocol::bindings_from_json;
use exprkit_core::{EngineConfig, Error, Expression, HandleTable, Request, Response};
use tracing::{debug, info, warn};

pub struct Handler {
    config: EngineConfig,
    table: HandleTable,
}

impl Handler {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            table: HandleTable::with_config(config.clone()),
            config,
        }
    }

    pub fn handle(&mut self, request: &Request) -> Response {
        match request {
            Request::Prepare { expression } => self.handle_prepare(expression),
            Request::Identifiers { handle } => match self.table.identifiers(*handle) {
                Ok(identifiers) => Response::Identifiers { identifiers },
                Err(e) => e.into(),
            },
            Request::Execute { handle, bindings } => {
                let bindings = match bindings_from_json(bindings) {
                    Ok(bindings) => bindings,
                    Err(e) => return e.into(),
                };
                match self.table.evaluate(*handle, &bindings) {
                    Ok(value) => Response::eval_result(&value),
                    Err(e) => {
                        debug!(handle, "Execute failed: {}", e);
                        e.into()
                    }
                }
            }
            Request::Evaluate {
                expression,
                bindings,
            } => {
                let bindings = match bindings_from_json(bindings) {
                    Ok(bindings) => bindings,
                    Err(e) => return e.into(),
                };
                // one-shot: never registered, so nothing to release
                let result = Expression::prepare_with(expression, &self.config)
                    .map_err(Error::from)
                    .and_then(|expr| expr.evaluate(&bindings).map_err(Error::from));
                match result {
                    Ok(value) => Response::eval_result(&value),
                    Err(e) => e.into(),
                }
            }
            Request::Release { handle } => match self.table.release(*handle) {
                Ok(released) => Response::Released { released },
                Err(e) => {
                    warn!(handle, "Release failed: {}", e);
                    e.into()
                }
            },
            Request::Shutdown => {
                info!(live = self.table.len(), "Shutdown requested");
                Response::success()
            }
        }
    }

    fn handle_prepare(&mut self, expression: &str) -> Response {
        let handle = match self.table.prepare(expression) {
            Ok(handle) => handle,
            Err(e) => return e.into(),
        };
        match self.table.identifiers(handle) {
            Ok(identifiers) => {
                debug!(handle, "Prepared {:?}", expression);
                Response::Prepared {
                    handle,
                    identifiers,
                }
            }
            Err(e) => e.into(),
        }
    }
}
