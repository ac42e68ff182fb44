use super::stamp::{RequestSequence, Stamp};
use super::{Emitter, Notice};
use crate::model::{ApiError, RouteResult, ValidationError};
use crate::session::FlightApi;
use log::{debug, info, warn};
use std::sync::Arc;

#[derive(Debug)]
pub struct RouteEvent {
    pub stamp: Stamp,
    pub source: String,
    pub dest: String,
    pub result: Result<Vec<RouteResult>, ApiError>,
}

/// 一次中转航线查询
pub struct RouteFinder {
    api: Arc<dyn FlightApi>,
    emit: Emitter<RouteEvent>,
    seq: RequestSequence,
    source: String,
    dest: String,
    routes: Vec<RouteResult>,
    searched: bool,
    loading: bool,
    error: Option<String>,
}

impl RouteFinder {
    pub fn new(api: Arc<dyn FlightApi>, emit: Emitter<RouteEvent>) -> Self {
        Self {
            api,
            emit,
            seq: RequestSequence::new(),
            source: String::new(),
            dest: String::new(),
            routes: Vec::new(),
            searched: false,
            loading: false,
            error: None,
        }
    }

    pub fn search(&mut self, source: &str, dest: &str) -> Result<(), ValidationError> {
        let source = source.trim().to_uppercase();
        let dest = dest.trim().to_uppercase();
        if source.is_empty() || dest.is_empty() {
            return Err(ValidationError::MissingRouteEndpoint);
        }

        self.source = source.clone();
        self.dest = dest.clone();
        self.loading = true;
        self.error = None;

        let stamp = self.seq.issue();
        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        info!("查询航线 {} -> {} {}", source, dest, stamp);
        tokio::spawn(async move {
            let result = api.one_hop_routes(&source, &dest).await;
            emit.emit(RouteEvent {
                stamp,
                source,
                dest,
                result,
            });
        });
        Ok(())
    }

    pub fn handle(&mut self, evt: RouteEvent) -> Option<Notice> {
        if !self.seq.is_current(evt.stamp) {
            debug!("丢弃过期的航线结果 {} -> {} {}", evt.source, evt.dest, evt.stamp);
            return None;
        }
        self.loading = false;
        self.searched = true;
        match evt.result {
            Ok(routes) => {
                let n = routes.len();
                self.routes = routes;
                Some(Notice::Info(format!(
                    "✓ {} -> {} 共 {} 条中转航线",
                    evt.source, evt.dest, n
                )))
            }
            Err(e) => {
                warn!("查询航线 {} -> {} 失败: {}", evt.source, evt.dest, e);
                self.routes.clear();
                let msg = format!("✗ 查询航线失败: {}", e);
                self.error = Some(msg.clone());
                Some(Notice::Error(msg))
            }
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    pub fn routes(&self) -> &[RouteResult] {
        &self.routes
    }

    pub fn has_searched(&self) -> bool {
        self.searched
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
