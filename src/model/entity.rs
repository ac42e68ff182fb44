use crate::model::{Airline, Airport, ApiError, ValidationError};
use crate::session::FlightApi;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use super::airline::AIRLINE_SCHEMA;
use super::airport::AIRPORT_SCHEMA;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Airport,
    Airline,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Airport => "机场",
            EntityKind::Airline => "航空公司",
        }
    }

    /// 深链接路径段（/airports?selected=SFO）
    pub fn path(self) -> &'static str {
        match self {
            EntityKind::Airport => "airports",
            EntityKind::Airline => "airlines",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 关联查询结果：关联实体 + 航线数
///
/// 服务端可能返回空的关联实体，这类条目保留在原始列表中，但不展示也不计数。
#[derive(Debug, Clone, PartialEq)]
pub struct RelationEntry<R> {
    pub related: Option<R>,
    pub route_count: i64,
}

/// 目录 / 增删改控制器按实体类型参数化的接缝
///
/// `id` 是稳定身份（用于更新 / 删除），`iata` 是可变的查找键（用于关联查询和深链接）。
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Related: Entity;

    const KIND: EntityKind;

    fn id(&self) -> i64;
    fn iata(&self) -> &str;
    fn name(&self) -> &str;
    /// `needle` 已转小写
    fn matches(&self, needle: &str) -> bool;
    /// 列表 / 建议里的第二行
    fn subtitle(&self) -> String;
    fn schema() -> &'static [FieldSpec];

    fn fetch_all(api: Arc<dyn FlightApi>) -> BoxFuture<'static, Result<Vec<Self>, ApiError>>;
    fn fetch_related(
        api: Arc<dyn FlightApi>,
        iata: String,
    ) -> BoxFuture<'static, Result<Vec<RelationEntry<Self::Related>>, ApiError>>;
    fn create(
        api: Arc<dyn FlightApi>,
        payload: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, ApiError>>;
    fn update(
        api: Arc<dyn FlightApi>,
        id: i64,
        patch: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, ApiError>>;
    fn remove(api: Arc<dyn FlightApi>, id: i64) -> BoxFuture<'static, Result<String, ApiError>>;
}

impl Entity for Airport {
    type Related = Airline;

    const KIND: EntityKind = EntityKind::Airport;

    fn id(&self) -> i64 {
        self.id
    }

    fn iata(&self) -> &str {
        &self.iata
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, needle: &str) -> bool {
        self.matches_query(needle)
    }

    fn subtitle(&self) -> String {
        format!("{}, {}", or_unknown(&self.city), or_unknown(&self.country))
    }

    fn schema() -> &'static [FieldSpec] {
        AIRPORT_SCHEMA
    }

    fn fetch_all(api: Arc<dyn FlightApi>) -> BoxFuture<'static, Result<Vec<Self>, ApiError>> {
        Box::pin(async move { api.list_airports().await })
    }

    fn fetch_related(
        api: Arc<dyn FlightApi>,
        iata: String,
    ) -> BoxFuture<'static, Result<Vec<RelationEntry<Airline>>, ApiError>> {
        Box::pin(async move { api.airlines_at_airport(&iata).await })
    }

    fn create(
        api: Arc<dyn FlightApi>,
        payload: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, ApiError>> {
        Box::pin(async move { api.create_airport(&payload).await })
    }

    fn update(
        api: Arc<dyn FlightApi>,
        id: i64,
        patch: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, ApiError>> {
        Box::pin(async move { api.update_airport(id, &patch).await })
    }

    fn remove(api: Arc<dyn FlightApi>, id: i64) -> BoxFuture<'static, Result<String, ApiError>> {
        Box::pin(async move { api.delete_airport(id).await })
    }
}

impl Entity for Airline {
    type Related = Airport;

    const KIND: EntityKind = EntityKind::Airline;

    fn id(&self) -> i64 {
        self.id
    }

    fn iata(&self) -> &str {
        &self.iata
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, needle: &str) -> bool {
        self.matches_query(needle)
    }

    fn subtitle(&self) -> String {
        or_unknown(&self.country).to_string()
    }

    fn schema() -> &'static [FieldSpec] {
        AIRLINE_SCHEMA
    }

    fn fetch_all(api: Arc<dyn FlightApi>) -> BoxFuture<'static, Result<Vec<Self>, ApiError>> {
        Box::pin(async move { api.list_airlines().await })
    }

    fn fetch_related(
        api: Arc<dyn FlightApi>,
        iata: String,
    ) -> BoxFuture<'static, Result<Vec<RelationEntry<Airport>>, ApiError>> {
        Box::pin(async move { api.airports_for_airline(&iata).await })
    }

    fn create(
        api: Arc<dyn FlightApi>,
        payload: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, ApiError>> {
        Box::pin(async move { api.create_airline(&payload).await })
    }

    fn update(
        api: Arc<dyn FlightApi>,
        id: i64,
        patch: Map<String, Value>,
    ) -> BoxFuture<'static, Result<Value, ApiError>> {
        Box::pin(async move { api.update_airline(id, &patch).await })
    }

    fn remove(api: Arc<dyn FlightApi>, id: i64) -> BoxFuture<'static, Result<String, ApiError>> {
        Box::pin(async move { api.delete_airline(id).await })
    }
}

pub(crate) fn contains_ci(field: &str, needle: &str) -> bool {
    field.to_lowercase().contains(needle)
}

pub(crate) fn or_unknown(s: &str) -> &str {
    if s.is_empty() {
        "Unknown"
    } else {
        s
    }
}

/// 按过滤文本计算子集，返回原列表中的下标（保持原顺序）
///
/// 空文本返回全部下标。
pub fn filter_indices<E: Entity>(list: &[E], text: &str) -> Vec<usize> {
    if text.is_empty() {
        return (0..list.len()).collect();
    }
    let needle = text.to_lowercase();
    list.iter()
        .enumerate()
        .filter(|(_, e)| e.matches(&needle))
        .map(|(i, _)| i)
        .collect()
}

/// 去掉缺少关联实体的条目
pub fn visible_relations<R>(entries: &[RelationEntry<R>]) -> Vec<(&R, i64)> {
    entries
        .iter()
        .filter_map(|e| e.related.as_ref().map(|r| (r, e.route_count)))
        .collect()
}

// ---------------------------------------------------------------------------
// 表单字段声明与校验
// ---------------------------------------------------------------------------

/// 表单原始输入：字段名 -> 文本
pub type FormFields = std::collections::BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Int,
    Float,
    /// Y / N
    Flag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<&'static str>,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn with_default(name: &'static str, kind: FieldKind, default: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
        }
    }

    fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        match self.kind {
            FieldKind::Text => Ok(Value::String(raw.to_string())),
            FieldKind::Int => raw
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| self.not_numeric(raw)),
            FieldKind::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| self.not_numeric(raw)),
            FieldKind::Flag => match raw.to_ascii_uppercase().as_str() {
                "Y" => Ok(Value::from("Y")),
                "N" => Ok(Value::from("N")),
                _ => Err(ValidationError::BadFlag {
                    field: self.name,
                    value: raw.to_string(),
                }),
            },
        }
    }

    fn not_numeric(&self, raw: &str) -> ValidationError {
        ValidationError::NotNumeric {
            field: self.name,
            value: raw.to_string(),
        }
    }

    /// 空输入：必填报错；有默认值取默认；可选文本视为空串；其余视为缺失
    fn resolve_blank(&self) -> Result<Option<Value>, ValidationError> {
        if self.required {
            return Err(ValidationError::Missing(self.name));
        }
        match self.default {
            Some(d) => self.parse(d).map(Some),
            None => Ok(None),
        }
    }
}

fn blank(raw: Option<&String>) -> Option<&str> {
    raw.map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn check_known(schema: &[FieldSpec], form: &FormFields) -> Result<(), ValidationError> {
    for key in form.keys() {
        if !schema.iter().any(|f| f.name == key) {
            return Err(ValidationError::UnknownField(key.clone()));
        }
    }
    Ok(())
}

/// 新建：按声明校验必填项、解析数字、补默认值
pub fn build_payload(
    schema: &[FieldSpec],
    form: &FormFields,
) -> Result<Map<String, Value>, ValidationError> {
    check_known(schema, form)?;
    let mut payload = Map::new();
    for spec in schema {
        let value = match blank(form.get(spec.name)) {
            Some(raw) => Some(spec.parse(raw)?),
            None => spec.resolve_blank()?,
        };
        if let Some(v) = value {
            payload.insert(spec.name.to_string(), v);
        }
    }
    Ok(payload)
}

/// 修改：只保留与原记录不同的字段（部分更新）
pub fn diff_payload<E: Serialize>(
    schema: &[FieldSpec],
    original: &E,
    edited: &FormFields,
) -> Result<Map<String, Value>, ValidationError> {
    check_known(schema, edited)?;
    let original = match serde_json::to_value(original) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };

    let mut patch = Map::new();
    for spec in schema {
        let Some(raw) = edited.get(spec.name) else {
            continue;
        };
        let value = match blank(Some(raw)) {
            Some(raw) => spec.parse(raw)?,
            None => match (spec.kind, spec.resolve_blank()?) {
                (_, Some(v)) => v,
                (FieldKind::Text, None) => Value::String(String::new()),
                (_, None) => return Err(ValidationError::Missing(spec.name)),
            },
        };
        let unchanged = original
            .get(spec.name)
            .map(|old| same_value(spec.kind, old, &value))
            .unwrap_or(false);
        if !unchanged {
            patch.insert(spec.name.to_string(), value);
        }
    }
    Ok(patch)
}

fn same_value(kind: FieldKind, old: &Value, new: &Value) -> bool {
    match kind {
        FieldKind::Float | FieldKind::Int => match (old.as_f64(), new.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => old == new,
        },
        FieldKind::Flag => match (old.as_str(), new.as_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => old == new,
        },
        FieldKind::Text => old == new,
    }
}
