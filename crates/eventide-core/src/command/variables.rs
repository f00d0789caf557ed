//! Session variable, property and chronometer commands

use super::cursor::Cursor;
use super::{CommandState, Outcome};
use crate::context::{ExecutionContext, InputEvent, Scope};
use crate::dynamic::DynamicValue;
use crate::error::Result;
use crate::object::Orientation;
use crate::session::ItemKind;
use crate::value::Value;

/// Operator applied by variable/inventory/statistic mutation commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Set,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl Operation {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Operation::Set),
            1 => Some(Operation::Add),
            2 => Some(Operation::Sub),
            3 => Some(Operation::Mul),
            4 => Some(Operation::Div),
            5 => Some(Operation::Mod),
            _ => None,
        }
    }

    /// Apply to integers; division and modulo by zero leave `current`
    pub fn apply_i64(&self, current: i64, value: i64) -> i64 {
        match self {
            Operation::Set => value,
            Operation::Add => current.wrapping_add(value),
            Operation::Sub => current.wrapping_sub(value),
            Operation::Mul => current.wrapping_mul(value),
            Operation::Div if value != 0 => current / value,
            Operation::Mod if value != 0 => current % value,
            _ => current,
        }
    }

    pub fn apply_f64(&self, current: f64, value: f64) -> f64 {
        match self {
            Operation::Set => value,
            Operation::Add => current + value,
            Operation::Sub => current - value,
            Operation::Mul => current * value,
            Operation::Div if value != 0.0 => current / value,
            Operation::Mod if value != 0.0 => current % value,
            _ => current,
        }
    }

    /// Apply over resolved values, keeping integer math when both sides are
    /// integers and non-numeric assignment for `Set`
    pub fn apply_value(&self, current: Value, value: Value) -> Value {
        if let Operation::Set = self {
            if !matches!(value, Value::Int(_) | Value::Float(_)) {
                return value;
            }
        }
        match (current.as_int(), value.as_int(), &current, &value) {
            (Some(c), Some(v), Value::Int(_), Value::Int(_)) => Value::Int(self.apply_i64(c, v)),
            _ => {
                let c = current.as_float().unwrap_or(0.0);
                let v = value.as_float().unwrap_or(0.0);
                Value::Float(self.apply_f64(c, v))
            }
        }
    }
}

/// Which characteristic of a map object a variable can be set from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectCharacteristic {
    PositionX,
    PositionY,
    PositionZ,
    Orientation,
    State,
}

impl ObjectCharacteristic {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(ObjectCharacteristic::PositionX),
            1 => Some(ObjectCharacteristic::PositionY),
            2 => Some(ObjectCharacteristic::PositionZ),
            3 => Some(ObjectCharacteristic::Orientation),
            4 => Some(ObjectCharacteristic::State),
            _ => None,
        }
    }
}

/// The ten value sources `ChangeVariables` can draw from
#[derive(Debug, Clone, PartialEq)]
pub enum VariableSource {
    Value(DynamicValue),
    Random(DynamicValue, DynamicValue),
    Message(DynamicValue),
    Switch(DynamicValue),
    /// Spatial object lookup; spans at least two ticks
    ObjectCharacteristic {
        object: DynamicValue,
        characteristic: ObjectCharacteristic,
    },
    InventoryCount {
        kind: ItemKind,
        id: DynamicValue,
    },
    Currency(DynamicValue),
    BattlerStat {
        battler: DynamicValue,
        stat: DynamicValue,
    },
    /// Instance id of the n-th battler of the current troop
    EnemyInstance(DynamicValue),
    Chronometer(DynamicValue),
}

impl VariableSource {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(match cursor.next_i64()? {
            1 => VariableSource::Random(cursor.next_dynamic()?, cursor.next_dynamic()?),
            2 => VariableSource::Message(cursor.next_dynamic()?),
            3 => VariableSource::Switch(cursor.next_dynamic()?),
            4 => VariableSource::ObjectCharacteristic {
                object: cursor.next_dynamic()?,
                characteristic: ObjectCharacteristic::from_i64(cursor.next_i64()?)
                    .unwrap_or(ObjectCharacteristic::PositionX),
            },
            5 => VariableSource::InventoryCount {
                kind: ItemKind::from_i64(cursor.next_i64()?).unwrap_or(ItemKind::Item),
                id: cursor.next_dynamic()?,
            },
            6 => VariableSource::Currency(cursor.next_dynamic()?),
            7 => VariableSource::BattlerStat {
                battler: cursor.next_dynamic()?,
                stat: cursor.next_dynamic()?,
            },
            8 => VariableSource::EnemyInstance(cursor.next_dynamic()?),
            9 => VariableSource::Chronometer(cursor.next_dynamic()?),
            _ => VariableSource::Value(cursor.next_dynamic()?),
        })
    }
}

/// Per-invocation state of [`ChangeVariables`]
#[derive(Debug, Default)]
pub struct ChangeVariablesState {
    pub value: Option<Value>,
    /// The object-characteristic search was issued on a previous tick
    pub requested: bool,
    pub committed: bool,
}

/// Resolve a value source, apply an operator across a variable range
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeVariables {
    /// Target variable (raw index)
    pub start: DynamicValue,
    pub is_range: bool,
    /// Inclusive range end when `is_range`
    pub end_index: i64,
    pub operation: Operation,
    pub source: VariableSource,
}

impl ChangeVariables {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let start = cursor.next_dynamic()?;
        let is_range = cursor.next_bool()?;
        let end_index = if is_range { cursor.next_i64()? } else { 0 };
        let operation = Operation::from_i64(cursor.next_i64()?).unwrap_or(Operation::Set);
        let source = VariableSource::read(cursor)?;
        Ok(Self {
            start,
            is_range,
            end_index,
            operation,
            source,
        })
    }

    pub fn initialize(&self) -> CommandState {
        CommandState::ChangeVariables(ChangeVariablesState::default())
    }

    pub fn update(
        &self,
        state: &mut CommandState,
        ctx: &mut ExecutionContext,
        scope: &Scope,
    ) -> Outcome {
        let CommandState::ChangeVariables(st) = state else {
            return Outcome::Advance(1);
        };
        if st.value.is_none() {
            match &self.source {
                VariableSource::ObjectCharacteristic {
                    object,
                    characteristic,
                } => {
                    // the object search resolves one tick after it is issued
                    if !st.requested {
                        st.requested = true;
                        return Outcome::Pending;
                    }
                    st.value = Some(self.characteristic_value(ctx, scope, object, *characteristic));
                }
                source => st.value = Some(self.source_value(ctx, scope, source)),
            }
        }
        if !st.committed {
            if let Some(value) = st.value.clone() {
                self.commit(ctx, scope, value);
            }
            st.committed = true;
        }
        Outcome::Advance(1)
    }

    fn source_value(
        &self,
        ctx: &mut ExecutionContext,
        scope: &Scope,
        source: &VariableSource,
    ) -> Value {
        match source {
            VariableSource::Value(v) => ctx.resolve(v, scope),
            VariableSource::Random(min, max) => {
                let min = ctx.resolve_i64(min, scope);
                let max = ctx.resolve_i64(max, scope);
                Value::Int(ctx.rng.range_i64(min, max))
            }
            VariableSource::Message(v) => Value::String(ctx.resolve_string(v, scope)),
            VariableSource::Switch(v) => Value::Bool(ctx.resolve_bool(v, scope)),
            VariableSource::InventoryCount { kind, id } => {
                let id = ctx.resolve_i64(id, scope);
                Value::Int(ctx.game.item_count(*kind, id))
            }
            VariableSource::Currency(id) => {
                let id = ctx.resolve_i64(id, scope);
                Value::Float(ctx.game.currency(id))
            }
            VariableSource::BattlerStat { battler, stat } => {
                let instance = ctx.resolve_i64(battler, scope);
                let stat = ctx.resolve_string(stat, scope);
                match ctx.game.battler(instance) {
                    Some(b) => Value::Float(b.statistics.get(&stat).copied().unwrap_or(0.0)),
                    None => Value::Null,
                }
            }
            VariableSource::EnemyInstance(index) => {
                let index = ctx.resolve_i64(index, scope).max(0) as usize;
                ctx.game
                    .hidden
                    .iter()
                    .filter(|b| b.is_monster)
                    .nth(index)
                    .map(|b| Value::Int(b.instance_id))
                    .unwrap_or(Value::Null)
            }
            VariableSource::Chronometer(id) => {
                let id = ctx.resolve_i64(id, scope);
                match ctx.game.chronometers.get(&id) {
                    Some(c) => Value::Int((c.value_ms(ctx.now_ms) / 1000) as i64),
                    None => Value::Null,
                }
            }
            VariableSource::ObjectCharacteristic { .. } => Value::Null,
        }
    }

    fn characteristic_value(
        &self,
        ctx: &mut ExecutionContext,
        scope: &Scope,
        object: &DynamicValue,
        characteristic: ObjectCharacteristic,
    ) -> Value {
        let found = ctx
            .resolve_object(object, scope)
            .and_then(|id| ctx.scene.object(id));
        let Some(object) = found else {
            return Value::Null;
        };
        match characteristic {
            ObjectCharacteristic::PositionX => Value::Float(object.position.x),
            ObjectCharacteristic::PositionY => Value::Float(object.position.y),
            ObjectCharacteristic::PositionZ => Value::Float(object.position.z),
            ObjectCharacteristic::Orientation => Value::Int(match object.orientation {
                Orientation::South => 0,
                Orientation::West => 1,
                Orientation::North => 2,
                Orientation::East => 3,
            }),
            ObjectCharacteristic::State => object
                .current_state()
                .map(Value::Int)
                .unwrap_or(Value::Null),
        }
    }

    fn commit(&self, ctx: &mut ExecutionContext, scope: &Scope, value: Value) {
        let start = ctx
            .resolve_raw(&self.start, scope)
            .as_int()
            .unwrap_or(0)
            .max(0) as usize;
        let end = if self.is_range {
            self.end_index.max(start as i64) as usize
        } else {
            start
        };
        for index in start..=end {
            let current = ctx.game.variable(index);
            let next = self.operation.apply_value(current, value.clone());
            ctx.game.set_variable(index, next);
        }
    }
}

/// Per-invocation state of [`InputNumber`]
#[derive(Debug)]
pub struct InputNumberState {
    pub digits: Vec<i64>,
    pub index: usize,
}

/// Interactive digit spinner committed to a variable
#[derive(Debug, Clone, PartialEq)]
pub struct InputNumber {
    pub digit_count: DynamicValue,
    /// Target variable (raw index)
    pub variable: DynamicValue,
}

impl InputNumber {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            digit_count: cursor.next_dynamic()?,
            variable: cursor.next_dynamic()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let count = ctx.resolve_i64(&self.digit_count, scope).clamp(1, 18) as usize;
        ctx.platform.open_number_input(count);
        CommandState::InputNumber(InputNumberState {
            digits: vec![0; count],
            index: 0,
        })
    }

    pub fn update(
        &self,
        state: &mut CommandState,
        ctx: &mut ExecutionContext,
        scope: &mut Scope,
    ) -> Outcome {
        let CommandState::InputNumber(st) = state else {
            return Outcome::Advance(1);
        };
        while let Some(event) = scope.input.pop() {
            match event {
                InputEvent::Up => st.digits[st.index] = (st.digits[st.index] + 1) % 10,
                InputEvent::Down => st.digits[st.index] = (st.digits[st.index] + 9) % 10,
                InputEvent::Left => st.index = st.index.saturating_sub(1),
                InputEvent::Right => st.index = (st.index + 1).min(st.digits.len() - 1),
                InputEvent::Action => {
                    let number = st.digits.iter().fold(0i64, |acc, d| acc * 10 + d);
                    let index = ctx
                        .resolve_raw(&self.variable, scope)
                        .as_int()
                        .unwrap_or(0)
                        .max(0) as usize;
                    ctx.game.set_variable(index, Value::Int(number));
                    ctx.platform.close_number_input();
                    return Outcome::Advance(1);
                }
                _ => {}
            }
        }
        Outcome::Pending
    }
}

/// Mutate a bound property of the acting object
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeProperty {
    /// Target property (raw index)
    pub property: DynamicValue,
    pub operation: Operation,
    pub value: DynamicValue,
}

impl ChangeProperty {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            property: cursor.next_dynamic()?,
            operation: Operation::from_i64(cursor.next_i64()?).unwrap_or(Operation::Set),
            value: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let index = ctx
            .resolve_raw(&self.property, scope)
            .as_int()
            .unwrap_or(0)
            .max(0) as usize;
        let current = ctx.resolve(&DynamicValue::Property(index), scope);
        let value = ctx.resolve(&self.value, scope);
        let next = self.operation.apply_value(current, value);
        let literal = match next {
            Value::Bool(b) => DynamicValue::Switch(b),
            Value::Int(n) => DynamicValue::Number(n),
            Value::Float(f) => DynamicValue::NumberDouble(f),
            Value::String(s) => DynamicValue::Message(s),
            _ => DynamicValue::None,
        };
        if let Some(object) = ctx.scene.object_mut(scope.object) {
            object.properties.insert(index, literal);
        }
        Outcome::Advance(1)
    }
}

/// Chronometer operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChronometerOperation {
    Start,
    Pause,
    Continue,
    Stop,
}

impl ChronometerOperation {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(ChronometerOperation::Start),
            1 => Some(ChronometerOperation::Pause),
            2 => Some(ChronometerOperation::Continue),
            3 => Some(ChronometerOperation::Stop),
            _ => None,
        }
    }
}

/// Start/pause/continue/stop a chronometer
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeChronometer {
    pub operation: ChronometerOperation,
    pub id: DynamicValue,
    /// Count down from this many seconds instead of up
    pub countdown: Option<DynamicValue>,
}

impl ChangeChronometer {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let operation =
            ChronometerOperation::from_i64(cursor.next_i64()?).unwrap_or(ChronometerOperation::Start);
        let id = cursor.next_dynamic()?;
        let countdown = if matches!(operation, ChronometerOperation::Start) && cursor.next_bool()? {
            Some(cursor.next_dynamic()?)
        } else {
            None
        };
        Ok(Self {
            operation,
            id,
            countdown,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let id = ctx.resolve_i64(&self.id, scope);
        let now = ctx.now_ms;
        match self.operation {
            ChronometerOperation::Start => {
                let countdown_ms = self
                    .countdown
                    .as_ref()
                    .map(|c| (ctx.resolve_f64(c, scope) * 1000.0).max(0.0) as u64);
                ctx.game.start_chronometer(id, now, countdown_ms);
            }
            ChronometerOperation::Pause => {
                if let Some(chrono) = ctx.game.chronometers.get_mut(&id) {
                    if !chrono.paused {
                        chrono.accumulated_ms += now.saturating_sub(chrono.started_at_ms);
                        chrono.paused = true;
                    }
                }
            }
            ChronometerOperation::Continue => {
                if let Some(chrono) = ctx.game.chronometers.get_mut(&id) {
                    if chrono.paused {
                        chrono.started_at_ms = now;
                        chrono.paused = false;
                    }
                }
            }
            ChronometerOperation::Stop => {
                ctx.game.chronometers.shift_remove(&id);
            }
        }
        ctx.platform.request_hud_repaint();
        Outcome::Advance(1)
    }
}

/// Hand a script snippet to the host
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub code: DynamicValue,
}

impl Script {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            code: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let code = ctx.resolve_string(&self.code, scope);
        ctx.platform.run_script(&code);
        Outcome::Advance(1)
    }
}

/// Invoke a host plugin command
#[derive(Debug, Clone, PartialEq)]
pub struct Plugin {
    pub plugin_id: i64,
    pub command: DynamicValue,
}

impl Plugin {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            plugin_id: cursor.next_i64()?,
            command: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        let command = ctx.resolve_string(&self.command, scope);
        ctx.platform.run_plugin(self.plugin_id, &command);
        Outcome::Advance(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_zero_guards() {
        assert_eq!(Operation::Div.apply_i64(10, 0), 10);
        assert_eq!(Operation::Mod.apply_i64(10, 0), 10);
        assert_eq!(Operation::Div.apply_i64(10, 2), 5);
        assert_eq!(Operation::Mod.apply_f64(7.5, 2.0), 1.5);
    }

    #[test]
    fn test_apply_value_keeps_integer_math() {
        assert_eq!(
            Operation::Add.apply_value(Value::Int(2), Value::Int(3)),
            Value::Int(5)
        );
        assert_eq!(
            Operation::Add.apply_value(Value::Int(2), Value::Float(0.5)),
            Value::Float(2.5)
        );
        assert_eq!(
            Operation::Set.apply_value(Value::Int(2), Value::String("hi".into())),
            Value::String("hi".into())
        );
    }
}
