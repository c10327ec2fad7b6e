pub mod error;
pub mod handlers;

pub use error::DslError;

use crate::core::broadcast::BroadcastKind;
use crate::core::tensor::{Shape, Tensor};
use crate::engine::TensorDb;
use handlers::{handle_check, handle_define, handle_let, handle_show, handle_verify};
use serde::Serialize;

/// Resultado de CHECK
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub left: String,
    pub right: String,
    pub output_shape: Option<Shape>,
    pub kind: Option<BroadcastKind>,
    pub violation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub enum DslOutput {
    None,
    Message(String),
    Tensor(Tensor),
    Check(CheckReport),
}

use std::fmt;

impl fmt::Display for DslOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DslOutput::None => Ok(()),
            DslOutput::Message(s) => write!(f, "{}", s),
            DslOutput::Tensor(t) => write!(
                f,
                "Tensor: shape {} dtype {} values: {:?}",
                t.shape(),
                t.dtype(),
                t.data()
            ),
            DslOutput::Check(report) => match (&report.output_shape, &report.kind) {
                (Some(shape), Some(kind)) => write!(
                    f,
                    "{} WITH {}: compatible, output shape {}, broadcast {}",
                    report.left, report.right, shape, kind
                ),
                _ => write!(
                    f,
                    "{} WITH {}: incompatible, {}",
                    report.left,
                    report.right,
                    report.violation.as_deref().unwrap_or("unknown violation")
                ),
            },
        }
    }
}

/// Ejecuta un script completo (varias líneas) sobre un TensorDb y devuelve
/// las salidas no vacías en orden.
pub fn execute_script(db: &mut TensorDb, script: &str) -> Result<Vec<DslOutput>, DslError> {
    let mut outputs = Vec::new();
    let mut current_cmd = String::new();
    let mut start_line = 0;
    let mut paren_balance = 0;

    for (idx, raw_line) in script.lines().enumerate() {
        let line = raw_line.trim();

        // Ignorar vacío y comentarios si no estamos dentro de un comando
        if current_cmd.is_empty() {
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            start_line = idx + 1;
        }

        if !current_cmd.is_empty() {
            current_cmd.push(' ');
        }
        current_cmd.push_str(line);

        paren_balance += paren_delta(line);

        // el comando termina cuando los paréntesis quedan balanceados
        if paren_balance == 0 {
            let output = execute_line(db, &current_cmd, start_line)?;
            if !matches!(output, DslOutput::None) {
                outputs.push(output);
            }
            current_cmd.clear();
        }
    }

    if !current_cmd.is_empty() {
        return Err(DslError::Parse {
            line: start_line,
            msg: "Unexpected end of script (unbalanced parentheses?)".into(),
        });
    }

    Ok(outputs)
}

/// Net change in parenthesis depth contributed by `line`
pub fn paren_delta(line: &str) -> i32 {
    line.chars().fold(0, |acc, c| match c {
        '(' => acc + 1,
        ')' => acc - 1,
        _ => acc,
    })
}

/// Ejecuta una sola línea de DSL
pub fn execute_line(db: &mut TensorDb, line: &str, line_no: usize) -> Result<DslOutput, DslError> {
    let line = strip_wrapping_parens(line.trim());

    if line.starts_with("DEFINE ") {
        handle_define(db, line, line_no)
    } else if line.starts_with("LET ") {
        handle_let(db, line, line_no)
    } else if line.starts_with("SHOW ") {
        handle_show(db, line, line_no)
    } else if line.starts_with("CHECK ") {
        handle_check(db, line, line_no)
    } else if line.starts_with("VERIFY ") {
        handle_verify(db, line, line_no)
    } else {
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            return Ok(DslOutput::None);
        }
        Err(DslError::Parse {
            line: line_no,
            msg: format!("Unknown command: {}", line),
        })
    }
}

/// "(LET c = ...)" -> "LET c = ..."; multi-line commands are written in parens.
fn strip_wrapping_parens(line: &str) -> &str {
    let mut line = line;
    while line.starts_with('(') && line.ends_with(')') {
        line = line[1..line.len() - 1].trim();
    }
    line
}
