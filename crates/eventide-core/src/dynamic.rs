//! Dynamic value resolver
//!
//! A [`DynamicValue`] is the tagged, lazily-resolved value form every command
//! field is authored in: a literal, a session variable reference, a bound
//! parameter/property, a database reference, or a composite. The kind of a
//! value never changes after construction; resolution is read-only and
//! side-effect free apart from advisory error reports.

use crate::data::{DataTables, TableKind};
use crate::error::{EngineError, Error, Result};
use crate::platform::Platform;
use crate::session::Game;
use crate::value::Value;
use indexmap::IndexMap;
use serde_json::{json, Value as Json};

/// Stable integer kind ids, as persisted in `{k, v}` JSON pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ValueKind {
    None = 0,
    Any = 1,
    Default = 2,
    Number = 3,
    NumberDouble = 4,
    Switch = 5,
    Message = 6,
    Keyboard = 7,
    Variable = 8,
    Parameter = 9,
    Property = 10,
    Class = 11,
    Hero = 12,
    Monster = 13,
    Troop = 14,
    Item = 15,
    Weapon = 16,
    Armor = 17,
    Skill = 18,
    Status = 19,
    Animation = 20,
    Tileset = 21,
    Currency = 22,
    Detection = 23,
    Song = 24,
    Picture = 25,
    CommonReaction = 26,
    Vector2 = 27,
    Vector3 = 28,
    CustomStructure = 29,
    CustomList = 30,
}

/// A tagged, resolvable value
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValue {
    /// No value
    None,
    /// Wildcard: equal to anything (dispatch matching)
    Any,
    /// Fall back to the declaration-site default of the owning parameter
    Default,
    /// Literal integer
    Number(i64),
    /// Literal float
    NumberDouble(f64),
    /// Literal boolean
    Switch(bool),
    /// Literal string
    Message(String),
    /// A key code; compares equal to raw numeric key codes
    Keyboard(i64),
    /// Live session variable by index
    Variable(usize),
    /// Bound parameter of the executing interpreter
    Parameter(usize),
    /// Bound property of the acting object
    Property(usize),
    /// Database reference
    Database(TableKind, i64),
    /// 2D vector of sub-values
    Vector2(Box<DynamicValue>, Box<DynamicValue>),
    /// 3D vector of sub-values
    Vector3(Box<DynamicValue>, Box<DynamicValue>, Box<DynamicValue>),
    /// Named sub-values
    CustomStructure(IndexMap<String, DynamicValue>),
    /// Ordered sub-values
    CustomList(Vec<DynamicValue>),
}

/// Options for one resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOpts {
    /// Return the raw index/id instead of dereferencing (used when writing
    /// to a variable rather than reading it)
    pub force_raw: bool,
    /// Recursively resolve custom structure/list entries
    pub deep: bool,
}

impl ResolveOpts {
    pub fn raw() -> Self {
        Self {
            force_raw: true,
            deep: false,
        }
    }

    pub fn deep() -> Self {
        Self {
            force_raw: false,
            deep: true,
        }
    }
}

/// Everything resolution may consult
///
/// The execution context builds one of these per resolution; a session-less
/// environment (data load time) leaves `game` and the bound tables empty and
/// session-dependent kinds report instead of resolving.
pub struct ResolveEnv<'a> {
    pub game: Option<&'a Game>,
    pub data: &'a DataTables,
    pub parameters: Option<&'a IndexMap<usize, DynamicValue>>,
    pub properties: Option<&'a IndexMap<usize, DynamicValue>>,
    pub platform: &'a mut dyn Platform,
}

impl ResolveEnv<'_> {
    fn report(&mut self, err: EngineError) {
        tracing::warn!(error = %err, "dynamic value resolution failed");
        self.platform.report_error(&err);
    }
}

impl DynamicValue {
    /// The stable kind id of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            DynamicValue::None => ValueKind::None,
            DynamicValue::Any => ValueKind::Any,
            DynamicValue::Default => ValueKind::Default,
            DynamicValue::Number(_) => ValueKind::Number,
            DynamicValue::NumberDouble(_) => ValueKind::NumberDouble,
            DynamicValue::Switch(_) => ValueKind::Switch,
            DynamicValue::Message(_) => ValueKind::Message,
            DynamicValue::Keyboard(_) => ValueKind::Keyboard,
            DynamicValue::Variable(_) => ValueKind::Variable,
            DynamicValue::Parameter(_) => ValueKind::Parameter,
            DynamicValue::Property(_) => ValueKind::Property,
            DynamicValue::Database(kind, _) => match kind {
                TableKind::Class => ValueKind::Class,
                TableKind::Hero => ValueKind::Hero,
                TableKind::Monster => ValueKind::Monster,
                TableKind::Troop => ValueKind::Troop,
                TableKind::Item => ValueKind::Item,
                TableKind::Weapon => ValueKind::Weapon,
                TableKind::Armor => ValueKind::Armor,
                TableKind::Skill => ValueKind::Skill,
                TableKind::Status => ValueKind::Status,
                TableKind::Animation => ValueKind::Animation,
                TableKind::Tileset => ValueKind::Tileset,
                TableKind::Currency => ValueKind::Currency,
                TableKind::Detection => ValueKind::Detection,
                TableKind::Song => ValueKind::Song,
                TableKind::Picture => ValueKind::Picture,
                TableKind::CommonReaction => ValueKind::CommonReaction,
            },
            DynamicValue::Vector2(..) => ValueKind::Vector2,
            DynamicValue::Vector3(..) => ValueKind::Vector3,
            DynamicValue::CustomStructure(_) => ValueKind::CustomStructure,
            DynamicValue::CustomList(_) => ValueKind::CustomList,
        }
    }

    /// Build from a persisted `(kind, raw)` pair
    ///
    /// Composite kinds (vectors, custom structures/lists) are only valid in
    /// full `{k, ...}` object form and go through [`DynamicValue::from_json`].
    pub fn from_kind_raw(k: i64, raw: &Json) -> Result<DynamicValue> {
        let int = || {
            raw.as_i64()
                .ok_or_else(|| Error::MalformedStream(format!("kind {} expects an integer", k)))
        };
        let index = || int().map(|i| i.max(0) as usize);
        let table = |kind: TableKind| int().map(|id| DynamicValue::Database(kind, id));
        Ok(match k {
            0 => DynamicValue::None,
            1 => DynamicValue::Any,
            2 => DynamicValue::Default,
            3 => DynamicValue::Number(int()?),
            4 => DynamicValue::NumberDouble(raw.as_f64().ok_or_else(|| {
                Error::MalformedStream("NumberDouble expects a number".to_string())
            })?),
            5 => DynamicValue::Switch(truthy_token(raw)),
            6 => DynamicValue::Message(
                raw.as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| raw.to_string()),
            ),
            7 => DynamicValue::Keyboard(int()?),
            8 => DynamicValue::Variable(index()?),
            9 => DynamicValue::Parameter(index()?),
            10 => DynamicValue::Property(index()?),
            11 => table(TableKind::Class)?,
            12 => table(TableKind::Hero)?,
            13 => table(TableKind::Monster)?,
            14 => table(TableKind::Troop)?,
            15 => table(TableKind::Item)?,
            16 => table(TableKind::Weapon)?,
            17 => table(TableKind::Armor)?,
            18 => table(TableKind::Skill)?,
            19 => table(TableKind::Status)?,
            20 => table(TableKind::Animation)?,
            21 => table(TableKind::Tileset)?,
            22 => table(TableKind::Currency)?,
            23 => table(TableKind::Detection)?,
            24 => table(TableKind::Song)?,
            25 => table(TableKind::Picture)?,
            26 => table(TableKind::CommonReaction)?,
            other => {
                return Err(Error::MalformedStream(format!(
                    "unknown dynamic value kind {}",
                    other
                )))
            }
        })
    }

    /// Build from full `{k, v, ...}` JSON with kind-specific extra fields
    pub fn from_json(json: &Json) -> Result<DynamicValue> {
        let k = json
            .get("k")
            .and_then(Json::as_i64)
            .ok_or_else(|| Error::MalformedStream("dynamic value without kind".to_string()))?;
        match k {
            27 => {
                let x = Self::from_json(field(json, "x")?)?;
                let y = Self::from_json(field(json, "y")?)?;
                Ok(DynamicValue::Vector2(Box::new(x), Box::new(y)))
            }
            28 => {
                let x = Self::from_json(field(json, "x")?)?;
                let y = Self::from_json(field(json, "y")?)?;
                let z = Self::from_json(field(json, "z")?)?;
                Ok(DynamicValue::Vector3(Box::new(x), Box::new(y), Box::new(z)))
            }
            29 => {
                let props = json
                    .get("customStructure")
                    .and_then(|c| c.get("properties"))
                    .and_then(Json::as_object)
                    .ok_or_else(|| {
                        Error::MalformedStream("custom structure without properties".to_string())
                    })?;
                let mut map = IndexMap::new();
                for (name, sub) in props {
                    map.insert(name.clone(), Self::from_json(sub)?);
                }
                Ok(DynamicValue::CustomStructure(map))
            }
            30 => {
                let list = json
                    .get("customList")
                    .and_then(|c| c.get("list"))
                    .and_then(Json::as_array)
                    .ok_or_else(|| {
                        Error::MalformedStream("custom list without entries".to_string())
                    })?;
                let mut entries = Vec::with_capacity(list.len());
                for sub in list {
                    entries.push(Self::from_json(sub)?);
                }
                Ok(DynamicValue::CustomList(entries))
            }
            _ => Self::from_kind_raw(k, json.get("v").unwrap_or(&Json::Null)),
        }
    }

    /// Serialize back to `{k, v, ...}` JSON
    pub fn to_json(&self) -> Json {
        let k = self.kind() as i64;
        match self {
            DynamicValue::None | DynamicValue::Any | DynamicValue::Default => {
                json!({ "k": k, "v": Json::Null })
            }
            DynamicValue::Number(n) | DynamicValue::Keyboard(n) => json!({ "k": k, "v": n }),
            DynamicValue::NumberDouble(f) => json!({ "k": k, "v": f }),
            DynamicValue::Switch(b) => json!({ "k": k, "v": b }),
            DynamicValue::Message(s) => json!({ "k": k, "v": s }),
            DynamicValue::Variable(i) | DynamicValue::Parameter(i) | DynamicValue::Property(i) => {
                json!({ "k": k, "v": i })
            }
            DynamicValue::Database(_, id) => json!({ "k": k, "v": id }),
            DynamicValue::Vector2(x, y) => {
                json!({ "k": k, "x": x.to_json(), "y": y.to_json() })
            }
            DynamicValue::Vector3(x, y, z) => {
                json!({ "k": k, "x": x.to_json(), "y": y.to_json(), "z": z.to_json() })
            }
            DynamicValue::CustomStructure(map) => {
                let props: serde_json::Map<String, Json> = map
                    .iter()
                    .map(|(name, sub)| (name.clone(), sub.to_json()))
                    .collect();
                json!({ "k": k, "customStructure": { "properties": props } })
            }
            DynamicValue::CustomList(list) => {
                let entries: Vec<Json> = list.iter().map(DynamicValue::to_json).collect();
                json!({ "k": k, "customList": { "list": entries } })
            }
        }
    }

    /// Resolve against live state
    ///
    /// Failures are advisory: they are reported through the environment and
    /// the resolution yields [`Value::Null`].
    pub fn resolve(&self, env: &mut ResolveEnv, opts: ResolveOpts) -> Value {
        match self {
            DynamicValue::None | DynamicValue::Any | DynamicValue::Default => Value::Null,
            DynamicValue::Number(n) => Value::Int(*n),
            DynamicValue::NumberDouble(f) => Value::Float(*f),
            DynamicValue::Switch(b) => Value::Bool(*b),
            DynamicValue::Message(s) => Value::String(s.clone()),
            DynamicValue::Keyboard(key) => Value::Int(*key),
            DynamicValue::Variable(index) => {
                if opts.force_raw {
                    return Value::Int(*index as i64);
                }
                match env.game {
                    Some(game) => game.variable(*index),
                    None => {
                        env.report(EngineError::InvalidSessionAccess { what: "variable" });
                        Value::Null
                    }
                }
            }
            DynamicValue::Parameter(index) => {
                Self::resolve_bound(env, opts, *index, BoundTable::Parameter)
            }
            DynamicValue::Property(index) => {
                Self::resolve_bound(env, opts, *index, BoundTable::Property)
            }
            DynamicValue::Database(kind, id) => {
                if opts.force_raw {
                    return Value::Int(*id);
                }
                if env.data.contains(*kind, *id) {
                    Value::Entity(*kind, *id)
                } else {
                    env.report(EngineError::MissingEntityReference {
                        table: kind.name(),
                        id: *id,
                    });
                    Value::Null
                }
            }
            DynamicValue::Vector2(x, y) => {
                let xv = x.resolve(env, opts).as_float().unwrap_or(0.0);
                let yv = y.resolve(env, opts).as_float().unwrap_or(0.0);
                Value::Vec2(xv, yv)
            }
            DynamicValue::Vector3(x, y, z) => {
                let xv = x.resolve(env, opts).as_float().unwrap_or(0.0);
                let yv = y.resolve(env, opts).as_float().unwrap_or(0.0);
                let zv = z.resolve(env, opts).as_float().unwrap_or(0.0);
                Value::Vec3(xv, yv, zv)
            }
            DynamicValue::CustomStructure(map) => {
                // shallow view keeps indices/ids unresolved
                let entry_opts = if opts.deep { opts } else { ResolveOpts::raw() };
                let mut out = crate::value::ValueMap::new();
                for (name, sub) in map {
                    out.insert(name.clone(), sub.resolve(env, entry_opts));
                }
                Value::Map(out)
            }
            DynamicValue::CustomList(list) => {
                let entry_opts = if opts.deep { opts } else { ResolveOpts::raw() };
                Value::List(list.iter().map(|sub| sub.resolve(env, entry_opts)).collect())
            }
        }
    }

    fn resolve_bound(
        env: &mut ResolveEnv,
        opts: ResolveOpts,
        index: usize,
        table: BoundTable,
    ) -> Value {
        if opts.force_raw {
            return Value::Int(index as i64);
        }
        let bound = match table {
            BoundTable::Parameter => env.parameters,
            BoundTable::Property => env.properties,
        };
        let Some(bound) = bound else {
            env.report(EngineError::InvalidSessionAccess { what: table.name() });
            return Value::Null;
        };
        match bound.get(&index) {
            // binding materialized defaults already, a Default here is a
            // declaration with no value
            Some(DynamicValue::Default) | None => Value::Null,
            Some(value) => {
                let value = value.clone();
                value.resolve(env, opts)
            }
        }
    }

    /// Equality with cross-kind exceptions
    ///
    /// `Any` matches unconditionally on either side; a `Keyboard` value
    /// matches a raw numeric key code of any other kind.
    pub fn is_equal(&self, other: &DynamicValue) -> bool {
        match (self, other) {
            (DynamicValue::Any, _) | (_, DynamicValue::Any) => true,
            (DynamicValue::Keyboard(key), o) | (o, DynamicValue::Keyboard(key))
                if !matches!(o, DynamicValue::Keyboard(_)) =>
            {
                o.as_literal_int() == Some(*key)
            }
            _ => self == other,
        }
    }

    /// The literal numeric payload, if this is a numeric literal
    pub fn as_literal_int(&self) -> Option<i64> {
        match self {
            DynamicValue::Number(n) | DynamicValue::Keyboard(n) => Some(*n),
            DynamicValue::NumberDouble(f) => Some(*f as i64),
            _ => None,
        }
    }

    /// A label name, if this value can index one (literal string or number)
    pub fn as_label(&self) -> Option<String> {
        match self {
            DynamicValue::Message(s) => Some(s.clone()),
            DynamicValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

enum BoundTable {
    Parameter,
    Property,
}

impl BoundTable {
    fn name(&self) -> &'static str {
        match self {
            BoundTable::Parameter => "parameter",
            BoundTable::Property => "property",
        }
    }
}

fn field<'a>(json: &'a Json, name: &str) -> Result<&'a Json> {
    json.get(name)
        .ok_or_else(|| Error::MalformedStream(format!("dynamic value missing field {}", name)))
}

fn truthy_token(raw: &Json) -> bool {
    match raw {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;

    fn env<'a>(
        data: &'a DataTables,
        game: Option<&'a Game>,
        platform: &'a mut RecordingPlatform,
    ) -> ResolveEnv<'a> {
        ResolveEnv {
            game,
            data,
            parameters: None,
            properties: None,
            platform,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let value = DynamicValue::Vector3(
            Box::new(DynamicValue::Number(1)),
            Box::new(DynamicValue::Variable(4)),
            Box::new(DynamicValue::NumberDouble(2.5)),
        );
        let back = DynamicValue::from_json(&value.to_json()).unwrap();
        assert_eq!(value, back);

        let mut map = IndexMap::new();
        map.insert("hp".to_string(), DynamicValue::Number(12));
        let value = DynamicValue::CustomStructure(map);
        assert_eq!(DynamicValue::from_json(&value.to_json()).unwrap(), value);
    }

    #[test]
    fn test_variable_without_session_reports() {
        let data = DataTables::new();
        let mut platform = RecordingPlatform::default();
        let mut env = env(&data, None, &mut platform);
        let value = DynamicValue::Variable(3).resolve(&mut env, ResolveOpts::default());
        assert!(value.is_null());
        assert_eq!(platform.errors.len(), 1);

        // raw access is allowed without a session (writing to the variable)
        let mut env = ResolveEnv {
            game: None,
            data: &data,
            parameters: None,
            properties: None,
            platform: &mut platform,
        };
        let value = DynamicValue::Variable(3).resolve(&mut env, ResolveOpts::raw());
        assert_eq!(value.as_int(), Some(3));
    }

    #[test]
    fn test_missing_database_entry_yields_null() {
        let data = DataTables::new();
        let mut platform = RecordingPlatform::default();
        let mut env = env(&data, None, &mut platform);
        let value = DynamicValue::Database(TableKind::Item, 99)
            .resolve(&mut env, ResolveOpts::default());
        assert!(value.is_null());
        assert_eq!(
            platform.errors[0],
            EngineError::MissingEntityReference {
                table: "item",
                id: 99
            }
        );
    }

    #[test]
    fn test_equality_exceptions() {
        let any = DynamicValue::Any;
        let key = DynamicValue::Keyboard(13);
        assert!(any.is_equal(&DynamicValue::Message("x".into())));
        assert!(DynamicValue::Number(7).is_equal(&any));
        assert!(key.is_equal(&DynamicValue::Number(13)));
        assert!(DynamicValue::Number(13).is_equal(&key));
        assert!(!key.is_equal(&DynamicValue::Number(14)));
        assert!(key.is_equal(&DynamicValue::Keyboard(13)));
        assert!(!DynamicValue::Message("a".into()).is_equal(&DynamicValue::Message("b".into())));
    }
}
