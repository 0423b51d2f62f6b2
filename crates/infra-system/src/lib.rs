// dirqueue Infrastructure - System Adapters
// Implements: ItemAction

pub mod shell_action;

pub use shell_action::ShellCommandAction;
