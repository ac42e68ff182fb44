use super::directory::DirectoryController;
use super::{Emitter, Notice};
use crate::model::{build_payload, diff_payload, ApiError, Entity, FormFields, MutationError};
use crate::session::FlightApi;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug)]
pub enum MutationEvent {
    Created {
        result: Result<Value, ApiError>,
    },
    Updated {
        id: i64,
        result: Result<Value, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormState<E> {
    Closed,
    Creating {
        fields: FormFields,
    },
    Editing {
        id: i64,
        original: E,
        fields: FormFields,
    },
}

/// 新建 / 修改表单
///
/// 失败时表单保持打开并记录错误，不自动重试。
pub struct MutationController<E: Entity> {
    api: Arc<dyn FlightApi>,
    emit: Emitter<MutationEvent>,
    form: FormState<E>,
    error: Option<String>,
    in_flight: bool,
}

impl<E: Entity> MutationController<E> {
    pub fn new(api: Arc<dyn FlightApi>, emit: Emitter<MutationEvent>) -> Self {
        Self {
            api,
            emit,
            form: FormState::Closed,
            error: None,
            in_flight: false,
        }
    }

    pub fn form(&self) -> &FormState<E> {
        &self.form
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn cancel(&mut self) {
        self.form = FormState::Closed;
        self.error = None;
    }

    /// 校验通过才发请求；校验失败时直接返回，不碰网络
    pub fn create(&mut self, fields: FormFields) -> Result<(), MutationError> {
        self.form = FormState::Creating {
            fields: fields.clone(),
        };
        let payload = build_payload(E::schema(), &fields).map_err(|e| self.fail(e.into()))?;

        self.error = None;
        self.in_flight = true;
        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        info!("新建{}: {}", E::KIND.label(), Value::Object(payload.clone()));
        tokio::spawn(async move {
            let result = E::create(api, payload).await;
            emit.emit(MutationEvent::Created { result });
        });
        Ok(())
    }

    /// 只提交与原记录不同的字段；没有差异时不发请求，返回 `Ok(false)`
    pub fn update(&mut self, original: &E, edited: FormFields) -> Result<bool, MutationError> {
        let id = original.id();
        self.form = FormState::Editing {
            id,
            original: original.clone(),
            fields: edited.clone(),
        };
        let patch = diff_payload(E::schema(), original, &edited).map_err(|e| self.fail(e.into()))?;

        if patch.is_empty() {
            info!("{} {} 没有改动", E::KIND.label(), id);
            self.cancel();
            return Ok(false);
        }

        self.error = None;
        self.in_flight = true;
        let api = Arc::clone(&self.api);
        let emit = self.emit.clone();
        info!("修改{} {}: {}", E::KIND.label(), id, Value::Object(patch.clone()));
        tokio::spawn(async move {
            let result = E::update(api, id, patch).await;
            emit.emit(MutationEvent::Updated { id, result });
        });
        Ok(true)
    }

    fn fail(&mut self, err: MutationError) -> MutationError {
        self.error = Some(err.to_string());
        err
    }

    /// 应用完成事件；成功后驱动目录重新加载
    pub fn handle(
        &mut self,
        evt: MutationEvent,
        directory: &mut DirectoryController<E>,
    ) -> Option<Notice> {
        self.in_flight = false;
        match evt {
            MutationEvent::Created { result: Ok(_) } => {
                self.cancel();
                directory.load();
                Some(Notice::Info(format!("✓ 已新建{}", E::KIND.label())))
            }
            MutationEvent::Updated { id, result: Ok(_) } => {
                self.cancel();
                // iata 可能刚被改掉，重新加载后按 id 找回同一条记录
                directory.reselect_after_reload(id);
                directory.load();
                Some(Notice::Info(format!("✓ 已修改{} (ID: {})", E::KIND.label(), id)))
            }
            MutationEvent::Created { result: Err(e) } => {
                warn!("新建{}失败: {}", E::KIND.label(), e);
                let msg = format!("新建{}失败: {}", E::KIND.label(), self.fail(e.into()));
                Some(Notice::Blocking(msg))
            }
            MutationEvent::Updated { id, result: Err(e) } => {
                warn!("修改{} {} 失败: {}", E::KIND.label(), id, e);
                let msg = format!("修改{}失败: {}", E::KIND.label(), self.fail(e.into()));
                Some(Notice::Blocking(msg))
            }
        }
    }
}
