use crate::dsl::{DslError, DslOutput};
use crate::engine::{BinaryOp, TensorDb};
use crate::utils::parsing::parse_f32;

/// LET c = SUBALPHA a b ALPHA 5.0
/// LET c = SUBTRACT a b
/// LET c = ADD a b
/// LET c = MULTIPLY a b
/// LET c = a - b
pub fn handle_let(db: &mut TensorDb, line: &str, line_no: usize) -> Result<DslOutput, DslError> {
    // Quitamos LET
    let rest = line.trim_start_matches("LET").trim();

    // output = ...
    let parts: Vec<&str> = rest.splitn(2, '=').collect();
    if parts.len() != 2 {
        return Err(DslError::Parse {
            line: line_no,
            msg: "Expected: LET <name> = ...".into(),
        });
    }

    let output_name = parts[0].trim();
    if output_name.is_empty() {
        return Err(DslError::Parse {
            line: line_no,
            msg: "Missing output name in LET".into(),
        });
    }

    let expr = parts[1].trim();
    let tokens: Vec<&str> = expr.split_whitespace().collect();

    if tokens.is_empty() {
        return Err(DslError::Parse {
            line: line_no,
            msg: "Missing expression in LET".into(),
        });
    }

    let (left, right, op) = match tokens[0] {
        "SUBALPHA" => {
            // SUBALPHA a b ALPHA 5.0
            if tokens.len() != 5 || tokens[3] != "ALPHA" {
                return Err(DslError::Parse {
                    line: line_no,
                    msg: "Expected: LET x = SUBALPHA a b ALPHA <number>".into(),
                });
            }
            let alpha = parse_f32(tokens[4]).map_err(|msg| DslError::Parse {
                line: line_no,
                msg: format!("Invalid alpha: {}", msg),
            })?;
            (tokens[1], tokens[2], BinaryOp::SubAlpha(alpha))
        }
        keyword @ ("SUBTRACT" | "ADD" | "MULTIPLY") => {
            if tokens.len() != 3 {
                return Err(DslError::Parse {
                    line: line_no,
                    msg: format!("Expected: LET x = {} a b", keyword),
                });
            }
            let op = match keyword {
                "SUBTRACT" => BinaryOp::Subtract,
                "ADD" => BinaryOp::Add,
                _ => BinaryOp::Multiply,
            };
            (tokens[1], tokens[2], op)
        }
        _ => match parse_infix_op(expr) {
            Some(parsed) => parsed,
            None => {
                return Err(DslError::Parse {
                    line: line_no,
                    msg: format!("Unknown LET expression: {}", expr),
                })
            }
        },
    };

    db.eval_binary(output_name, left, right, op)
        .map_err(|e| DslError::Engine {
            line: line_no,
            source: e,
        })?;

    Ok(DslOutput::Message(format!(
        "{} = {} {} {}",
        output_name, op, left, right
    )))
}

/// `a - b`, `a + b`, `a * b` with plain names on both sides
fn parse_infix_op(expr: &str) -> Option<(&str, &str, BinaryOp)> {
    let ops = [
        ('+', BinaryOp::Add),
        ('-', BinaryOp::Subtract),
        ('*', BinaryOp::Multiply),
    ];

    for (sym, op) in ops {
        if let Some((left, right)) = expr.split_once(sym) {
            let (left, right) = (left.trim(), right.trim());
            let is_name = |s: &str| !s.is_empty() && !s.contains(char::is_whitespace);
            if is_name(left) && is_name(right) {
                return Some((left, right, op));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::dtype::DType;
    use crate::core::tensor::Shape;

    fn db_with_operands() -> TensorDb {
        let mut db = TensorDb::with_config(EngineConfig::default());
        db.insert_named("a", Shape::new(vec![2]), DType::Float32, vec![4.0, 6.0])
            .unwrap();
        db.insert_named("b", Shape::new(vec![1]), DType::Float32, vec![2.0])
            .unwrap();
        db
    }

    #[test]
    fn test_let_subalpha() {
        let mut db = db_with_operands();
        handle_let(&mut db, "LET c = SUBALPHA a b ALPHA -1.5", 1).unwrap();
        assert_eq!(db.get("c").unwrap().data(), &[7.0, 9.0]);
    }

    #[test]
    fn test_let_keywords_and_infix() {
        let mut db = db_with_operands();
        handle_let(&mut db, "LET s = SUBTRACT a b", 1).unwrap();
        handle_let(&mut db, "LET p = a * b", 1).unwrap();
        handle_let(&mut db, "LET q = b + a", 1).unwrap();
        assert_eq!(db.get("s").unwrap().data(), &[2.0, 4.0]);
        assert_eq!(db.get("p").unwrap().data(), &[8.0, 12.0]);
        assert_eq!(db.get("q").unwrap().data(), &[6.0, 8.0]);
    }

    #[test]
    fn test_let_errors() {
        let mut db = db_with_operands();
        assert!(matches!(
            handle_let(&mut db, "LET c = SUBALPHA a b 5", 2),
            Err(DslError::Parse { line: 2, .. })
        ));
        assert!(matches!(
            handle_let(&mut db, "LET c = SUBALPHA a b ALPHA nan", 2),
            Err(DslError::Parse { .. })
        ));
        assert!(matches!(
            handle_let(&mut db, "LET c = SUBALPHA a missing ALPHA 1", 2),
            Err(DslError::Engine { .. })
        ));
    }
}
