//! Stat modifier engine
//!
//! - `StatSheet`: base values + timed modifiers, effective-value queries
//! - `StatModifier`: one additive or multiplicative adjustment with a countdown
//! - `buffs`: named buff/debuff wrappers and their re-application policies
//!
//! Behaviors only ever add modifiers. Countdown and removal happen in the
//! sheet's own `tick`, driven by whoever owns the sheet.

pub mod buffs;
pub mod modifier;
pub mod stat_sheet;

pub use buffs::{
    apply_buff, apply_debuff, BuffInfo, BuffType, DebuffInfo, DebuffType, DotSpec, StatusRequest,
    StatusSpec,
};
pub use modifier::{
    ModifierKey, ModifierOp, ModifierOutcome, ReapplyPolicy, StatModifier, TIME_EPSILON,
};
pub use stat_sheet::{StatSheet, StatType};
