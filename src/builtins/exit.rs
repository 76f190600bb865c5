use super::{BuiltinCommand, BuiltinContext, BuiltinError, BuiltinOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn usage(&self) -> &'static str {
        "exit [N]          leave the shell with status N (0 by default)"
    }

    fn execute(
        &self,
        args: &[String],
        _ctx: &mut BuiltinContext<'_>,
    ) -> Result<BuiltinOutcome, BuiltinError> {
        let code = args.first().map(|arg| parse_exit_code(arg)).unwrap_or(0);
        debug!(code, "exit requested");

        Ok(BuiltinOutcome::Exit(code))
    }
}

/// Reads an exit code the way C's `atoi` does: optional leading whitespace
/// and sign, then the longest digit prefix. No digits means 0.
pub fn parse_exit_code(arg: &str) -> i32 {
    let arg = arg.trim_start();
    let (negative, digits) = match arg.as_bytes().first() {
        Some(b'-') => (true, &arg[1..]),
        Some(b'+') => (false, &arg[1..]),
        _ => (false, arg),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.wrapping_mul(10).wrapping_add(i32::from(digit - b'0'))
        });

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}
