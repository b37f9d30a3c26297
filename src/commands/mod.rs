pub mod run;

pub type CmdResult<T> = ci_runner::Result<(T, i32)>;
