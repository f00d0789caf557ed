//! Control-flow commands
//!
//! Branching never aborts the walk: conditions pick between entering a
//! node's subtree and advancing past it, the interpreter turns block ends
//! into the matching skip, and labels provide the only non-local transfer.

use super::cursor::Cursor;
use super::{CommandState, Outcome};
use crate::context::{ExecutionContext, InputEvent, Scope};
use crate::dynamic::DynamicValue;
use crate::error::{EngineError, Result};
use crate::interpreter::Interpreter;
use crate::session::BattleResult;
use crate::value::Value;
use indexmap::IndexMap;

/// Comparison operator between two resolved values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
}

impl Comparison {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(Comparison::Equal),
            1 => Some(Comparison::NotEqual),
            2 => Some(Comparison::GreaterEqual),
            3 => Some(Comparison::LessEqual),
            4 => Some(Comparison::Greater),
            5 => Some(Comparison::Less),
            _ => None,
        }
    }
}

/// A two-operand condition over dynamic values
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub left: DynamicValue,
    pub comparison: Comparison,
    pub right: DynamicValue,
}

impl Condition {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let left = cursor.next_dynamic()?;
        let comparison = Comparison::from_i64(cursor.next_i64()?).unwrap_or(Comparison::Equal);
        let right = cursor.next_dynamic()?;
        Ok(Self {
            left,
            comparison,
            right,
        })
    }

    pub fn test(&self, ctx: &mut ExecutionContext, scope: &Scope) -> bool {
        let left = ctx.resolve(&self.left, scope);
        let right = ctx.resolve(&self.right, scope);
        match self.comparison {
            Comparison::Equal => left == right,
            Comparison::NotEqual => left != right,
            _ => {
                let (Some(l), Some(r)) = (left.as_float(), right.as_float()) else {
                    return false;
                };
                match self.comparison {
                    Comparison::GreaterEqual => l >= r,
                    Comparison::LessEqual => l <= r,
                    Comparison::Greater => l > r,
                    Comparison::Less => l < r,
                    _ => unreachable!(),
                }
            }
        }
    }
}

/// Enter the subtree when the condition holds, else fall to the next
/// sibling (an `Else`, when one follows)
#[derive(Debug, Clone, PartialEq)]
pub struct If {
    pub condition: Condition,
}

impl If {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            condition: Condition::read(cursor)?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        if self.condition.test(ctx, scope) {
            Outcome::Enter
        } else {
            Outcome::Advance(1)
        }
    }
}

/// Taken only by falling from a false `If`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Else;

impl Else {
    pub fn update(&self) -> Outcome {
        Outcome::Enter
    }
}

/// Branch on the last battle having been won
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IfWin;

impl IfWin {
    pub fn update(&self, ctx: &ExecutionContext) -> Outcome {
        if ctx.game.last_battle_result == Some(BattleResult::Win) {
            Outcome::Enter
        } else {
            Outcome::Advance(1)
        }
    }
}

/// Branch on the last battle having been lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IfLose;

impl IfLose {
    pub fn update(&self, ctx: &ExecutionContext) -> Outcome {
        if ctx.game.last_battle_result == Some(BattleResult::Lose) {
            Outcome::Enter
        } else {
            Outcome::Advance(1)
        }
    }
}

/// Re-enter the subtree while the condition holds
#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub condition: Condition,
}

impl While {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            condition: Condition::read(cursor)?,
        })
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &Scope) -> Outcome {
        if self.condition.test(ctx, scope) {
            Outcome::Enter
        } else {
            Outcome::Advance(1)
        }
    }
}

/// Exit past the enclosing `While`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WhileBreak;

impl WhileBreak {
    pub fn update(&self) -> Outcome {
        Outcome::Break
    }
}

/// Open a choice window; its `Choice` children branch on the selection
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayChoice {
    /// Selection committed when the window is cancelled
    pub cancel_index: i64,
    pub choices: Vec<DynamicValue>,
}

impl DisplayChoice {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let cancel_index = cursor.next_i64()?;
        let mut choices = Vec::new();
        while !cursor.done() {
            choices.push(cursor.next_dynamic()?);
        }
        Ok(Self {
            cancel_index,
            choices,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let texts: Vec<String> = self
            .choices
            .iter()
            .map(|c| ctx.resolve_string(c, scope))
            .collect();
        ctx.platform.open_choices(&texts);
        CommandState::None
    }

    pub fn update(&self, ctx: &mut ExecutionContext, scope: &mut Scope) -> Outcome {
        while let Some(event) = scope.input.pop() {
            let selection = match event {
                InputEvent::Choice(n) => Some(n),
                InputEvent::Cancel => Some(self.cancel_index),
                _ => None,
            };
            if let Some(selection) = selection {
                ctx.game.last_choice = selection;
                ctx.platform.close_choices();
                return Outcome::Enter;
            }
        }
        Outcome::Pending
    }
}

/// One branch under a `DisplayChoice`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    /// 1-based selection index this branch handles
    pub index: i64,
}

impl Choice {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            index: cursor.next_i64()?,
        })
    }

    pub fn update(&self, ctx: &ExecutionContext) -> Outcome {
        if ctx.game.last_choice == self.index {
            Outcome::Enter
        } else {
            Outcome::Advance(1)
        }
    }
}

/// A no-op jump target, recorded at tree build
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: DynamicValue,
}

impl Label {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            name: cursor.next_dynamic()?,
        })
    }
}

/// Relocate the cursor to a recorded label
#[derive(Debug, Clone, PartialEq)]
pub struct JumpToLabel {
    pub label: DynamicValue,
}

impl JumpToLabel {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            label: cursor.next_dynamic()?,
        })
    }

    pub fn update(&self) -> Outcome {
        match self.label.as_label() {
            Some(name) => Outcome::Jump(name),
            None => Outcome::Advance(1),
        }
    }
}

/// Suspend for a duration on the frame clock
#[derive(Debug, Clone, PartialEq)]
pub struct Wait {
    pub seconds: DynamicValue,
}

impl Wait {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            seconds: cursor.next_dynamic()?,
        })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let millis = (ctx.resolve_f64(&self.seconds, scope) * 1000.0).max(0.0) as u64;
        CommandState::WaitUntil {
            until_ms: ctx.now_ms + millis,
        }
    }

    pub fn update(&self, state: &CommandState, ctx: &ExecutionContext) -> Outcome {
        match state {
            CommandState::WaitUntil { until_ms } if ctx.now_ms < *until_ms => Outcome::Pending,
            _ => Outcome::Advance(1),
        }
    }
}

/// Authoring note, skipped at runtime
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
}

impl Comment {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        Ok(Self {
            text: cursor.next_string()?,
        })
    }
}

/// Run a globally-defined reaction to completion in a nested interpreter
#[derive(Debug, Clone, PartialEq)]
pub struct CallCommonReaction {
    pub id: i64,
    pub parameters: IndexMap<usize, DynamicValue>,
}

impl CallCommonReaction {
    pub fn read(cursor: &mut Cursor) -> Result<Self> {
        let id = cursor.next_i64()?;
        let mut parameters = IndexMap::new();
        while !cursor.done() {
            let index = cursor.next_i64()?.max(0) as usize;
            parameters.insert(index, cursor.next_dynamic()?);
        }
        Ok(Self { id, parameters })
    }

    pub fn initialize(&self, ctx: &mut ExecutionContext, scope: &Scope) -> CommandState {
        let Some(common) = ctx.data.common_reaction(self.id) else {
            ctx.report(EngineError::MissingEntityReference {
                table: "common reaction",
                id: self.id,
            });
            return CommandState::None;
        };
        let reaction = common.reaction.clone();
        let mut bound = common.default_parameters.clone();
        // arguments are evaluated in the caller's scope, then passed by value
        let arguments: Vec<(usize, Value)> = self
            .parameters
            .iter()
            .filter(|(_, v)| !matches!(v, DynamicValue::Default))
            .map(|(index, v)| (*index, ctx.resolve(v, scope)))
            .collect();
        for (index, value) in arguments {
            bound.insert(index, literal_from_value(value));
        }
        let nested_scope = Scope::new(scope.object, scope.state_id).with_parameters(bound);
        CommandState::Nested(Box::new(Interpreter::new(reaction, nested_scope)))
    }

    pub fn update(&self, state: &mut CommandState, ctx: &mut ExecutionContext) -> Outcome {
        match state {
            CommandState::Nested(nested) => {
                if nested.tick(ctx).is_done() {
                    Outcome::Advance(1)
                } else {
                    Outcome::Pending
                }
            }
            _ => Outcome::Advance(1),
        }
    }
}

/// Turn a resolved value back into a literal dynamic value
fn literal_from_value(value: Value) -> DynamicValue {
    match value {
        Value::Bool(b) => DynamicValue::Switch(b),
        Value::Int(n) => DynamicValue::Number(n),
        Value::Float(f) => DynamicValue::NumberDouble(f),
        Value::String(s) => DynamicValue::Message(s),
        Value::Entity(kind, id) => DynamicValue::Database(kind, id),
        _ => DynamicValue::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_read_and_ordering() {
        let tokens = vec![json!(3), json!(5), json!(4), json!(3), json!(2)];
        let mut cursor = Cursor::new(&tokens);
        let condition = Condition::read(&mut cursor).unwrap();
        assert_eq!(condition.left, DynamicValue::Number(5));
        assert_eq!(condition.comparison, Comparison::Greater);
        assert_eq!(condition.right, DynamicValue::Number(2));
    }

    #[test]
    fn test_jump_without_label_name_advances() {
        let jump = JumpToLabel {
            label: DynamicValue::Switch(true),
        };
        assert_eq!(jump.update(), Outcome::Advance(1));
        let jump = JumpToLabel {
            label: DynamicValue::Message("top".into()),
        };
        assert_eq!(jump.update(), Outcome::Jump("top".into()));
    }

    #[test]
    fn test_literal_from_value() {
        assert_eq!(
            literal_from_value(Value::Int(3)),
            DynamicValue::Number(3)
        );
        assert_eq!(
            literal_from_value(Value::String("a".into())),
            DynamicValue::Message("a".into())
        );
        assert_eq!(literal_from_value(Value::Null), DynamicValue::None);
    }
}
