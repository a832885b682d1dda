//! 文档解码
//!
//! Firestore REST 接口返回带类型标注的字段值（`{"stringValue": "x"}`），
//! 本模块把它们还原为普通 JSON，再反序列化为 [`crate::models`] 中的实体。
//! 解码失败统一映射为 [`NotifyError::Decode`]，由调用方决定按“未找到”处理。

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::error::{NotifyError, Result};

/// 将 Firestore 带类型的字段值转换为普通 JSON
///
/// 不认识的值类型返回错误；整篇文档解码时这类字段会被跳过，见 [`decode_fields`]。
pub fn decode_value(value: &Value) -> Result<Value> {
    decode_tagged(value)?.ok_or_else(|| NotifyError::decode("", format!("未知的字段类型: {value}")))
}

/// 解码单个带类型的值；值类型不认识时返回 `Ok(None)`
fn decode_tagged(value: &Value) -> Result<Option<Value>> {
    let Some(object) = value.as_object() else {
        return Err(NotifyError::decode("", format!("字段值不是对象: {value}")));
    };
    let Some((tag, inner)) = object.iter().next() else {
        return Err(NotifyError::decode("", "字段值为空对象"));
    };

    let decoded = match tag.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => match inner {
            Value::Bool(b) => Value::Bool(*b),
            other => return Err(NotifyError::decode("", format!("booleanValue 非法: {other}"))),
        },
        "integerValue" => match inner {
            // REST 接口中 int64 以字符串形式传输
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .map_err(|e| NotifyError::decode("", format!("integerValue 非法: {e}")))?,
            Value::Number(n) => Value::Number(n.clone()),
            other => return Err(NotifyError::decode("", format!("integerValue 非法: {other}"))),
        },
        "doubleValue" => inner
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => {
            let mut values = Vec::new();
            for item in inner.get("values").and_then(Value::as_array).into_iter().flatten() {
                match decode_tagged(item)? {
                    Some(decoded) => values.push(decoded),
                    None => warn!(value = %item, "跳过未知类型的数组元素"),
                }
            }
            Value::Array(values)
        }
        "mapValue" => Value::Object(decode_fields(inner.get("fields"))?),
        _ => return Ok(None),
    };

    Ok(Some(decoded))
}

/// 解码 `fields` 映射；缺失时视为空文档，未知类型的字段跳过并记录警告
pub fn decode_fields(fields: Option<&Value>) -> Result<Map<String, Value>> {
    let mut out = Map::new();
    if let Some(fields) = fields.and_then(Value::as_object) {
        for (key, value) in fields {
            match decode_tagged(value)? {
                Some(decoded) => {
                    out.insert(key.clone(), decoded);
                }
                None => warn!(field = %key, value = %value, "跳过未知类型的字段"),
            }
        }
    }
    Ok(out)
}

/// 判断快照是否为 Firestore REST 文档格式
///
/// 除对象形式的 `fields` 外还要求带有 `name` 或 `createTime`，
/// 以免把恰好有 `fields` 字段的普通快照误判为 REST 文档。
pub fn is_firestore_document(value: &Value) -> bool {
    value.as_object().is_some_and(|o| {
        o.get("fields").is_some_and(Value::is_object)
            && (o.contains_key("name") || o.contains_key("createTime"))
    })
}

/// 统一快照格式：Firestore 文档解码为普通对象，普通对象原样返回
pub fn normalize(value: Value) -> Result<Value> {
    if is_firestore_document(&value) {
        Ok(Value::Object(decode_fields(value.get("fields"))?))
    } else {
        Ok(value)
    }
}

/// 将普通 JSON 快照反序列化为实体，错误中带上文档路径便于排查
pub fn decode_entity<T: DeserializeOwned>(path: &str, value: &Value) -> Result<T> {
    T::deserialize(value).map_err(|e| NotifyError::decode(path, e))
}
