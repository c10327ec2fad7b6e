use crate::core::broadcast::BroadcastResult;
use crate::dsl::{CheckReport, DslError, DslOutput};
use crate::engine::{EngineError, TensorDb};

fn engine_err(line_no: usize) -> impl Fn(EngineError) -> DslError {
    move |e| DslError::Engine {
        line: line_no,
        source: e,
    }
}

/// SHOW x
/// SHOW ALL
/// SHOW ALL TENSORS
pub fn handle_show(db: &mut TensorDb, line: &str, line_no: usize) -> Result<DslOutput, DslError> {
    let rest = line.trim_start_matches("SHOW").trim();

    if rest == "ALL" || rest == "ALL TENSORS" {
        let mut names = db.list_names();
        names.sort();
        let mut output = String::from("--- ALL TENSORS ---\n");
        for name in names {
            if let Ok(t) = db.get(&name) {
                let origin = match db.origin(&name) {
                    Ok(Some(d)) => format!(" = {} {} {}", d.op, d.left, d.right),
                    _ => String::new(),
                };
                output.push_str(&format!(
                    "{}: shape {}, dtype {}, len {}{}\n",
                    name,
                    t.shape(),
                    t.dtype(),
                    t.len(),
                    origin
                ));
            }
        }
        output.push_str("-------------------");
        Ok(DslOutput::Message(output))
    } else if rest.is_empty() || rest.contains(char::is_whitespace) {
        Err(DslError::Parse {
            line: line_no,
            msg: "Expected: SHOW <name> | SHOW ALL".into(),
        })
    } else {
        let tensor = db.get(rest).map_err(engine_err(line_no))?;
        Ok(DslOutput::Tensor(tensor.clone()))
    }
}

/// CHECK a WITH b
///
/// Un resultado incompatible no es un error del script: se informa en el
/// CheckReport.
pub fn handle_check(db: &mut TensorDb, line: &str, line_no: usize) -> Result<DslOutput, DslError> {
    let rest = line.trim_start_matches("CHECK").trim();
    let (left, right) = match rest.split_once(" WITH ") {
        Some((l, r)) if !l.trim().is_empty() && !r.trim().is_empty() => (l.trim(), r.trim()),
        _ => {
            return Err(DslError::Parse {
                line: line_no,
                msg: "Expected: CHECK <name> WITH <name>".into(),
            })
        }
    };

    let report = match db.check(left, right).map_err(engine_err(line_no))? {
        BroadcastResult::Compatible(shape) => CheckReport {
            left: left.to_string(),
            right: right.to_string(),
            output_shape: Some(shape),
            kind: db.classify(left, right).ok(),
            violation: None,
        },
        BroadcastResult::Incompatible(err) => CheckReport {
            left: left.to_string(),
            right: right.to_string(),
            output_shape: None,
            kind: None,
            violation: Some(err.to_string()),
        },
    };
    Ok(DslOutput::Check(report))
}

/// VERIFY c
pub fn handle_verify(db: &mut TensorDb, line: &str, line_no: usize) -> Result<DslOutput, DslError> {
    let name = line.trim_start_matches("VERIFY").trim();
    if name.is_empty() {
        return Err(DslError::Parse {
            line: line_no,
            msg: "Expected: VERIFY <name>".into(),
        });
    }

    let error = db.verify(name).map_err(engine_err(line_no))?;
    Ok(DslOutput::Message(format!(
        "{}: max abs error vs reference = {:e}",
        name, error
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::dtype::DType;
    use crate::core::tensor::Shape;
    use crate::core::BroadcastKind;

    fn db() -> TensorDb {
        let mut db = TensorDb::with_config(EngineConfig::default());
        db.insert_named("m", Shape::new(vec![2, 3]), DType::Float32, vec![1.0; 6])
            .unwrap();
        db.insert_named("r", Shape::new(vec![1, 3]), DType::Float32, vec![1.0; 3])
            .unwrap();
        db.insert_named("bad", Shape::new(vec![4]), DType::Float32, vec![1.0; 4])
            .unwrap();
        db
    }

    #[test]
    fn test_check_reports() {
        let mut db = db();
        match handle_check(&mut db, "CHECK m WITH r", 1).unwrap() {
            DslOutput::Check(report) => {
                assert_eq!(report.output_shape, Some(Shape::new(vec![2, 3])));
                assert_eq!(report.kind, Some(BroadcastKind::RowB));
            }
            other => panic!("unexpected output {:?}", other),
        }
        match handle_check(&mut db, "CHECK m WITH bad", 1).unwrap() {
            DslOutput::Check(report) => {
                assert!(report.output_shape.is_none());
                assert!(report
                    .violation
                    .unwrap()
                    .contains("Broadcasting rule violation on axis 1: 3 vs 4"));
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_show_and_verify() {
        let mut db = db();
        db.eval_subalpha("c", "m", "r", 0.5).unwrap();
        let listing = handle_show(&mut db, "SHOW ALL", 1).unwrap().to_string();
        assert!(listing.contains("c: shape [2, 3]"));
        assert!(listing.contains("subalpha"));
        assert!(matches!(
            handle_show(&mut db, "SHOW c", 1),
            Ok(DslOutput::Tensor(_))
        ));
        let msg = handle_verify(&mut db, "VERIFY c", 1).unwrap().to_string();
        assert!(msg.starts_with("c: max abs error"));
        assert!(matches!(
            handle_verify(&mut db, "VERIFY m", 4),
            Err(DslError::Engine { line: 4, .. })
        ));
    }
}
