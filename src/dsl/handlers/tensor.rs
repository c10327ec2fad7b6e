use crate::core::dtype::DType;
use crate::core::tensor::Shape;
use crate::dsl::{DslError, DslOutput};
use crate::engine::{EngineError, TensorDb};
use crate::utils::parsing::{parse_f32_list, parse_usize_list, split_bracketed};

/// dtype when a DEFINE does not name one
pub const DEFAULT_DTYPE: DType = DType::BFloat16;

/// DEFINE a AS TENSOR [2, 2] VALUES [1, 2, 3, 4]
/// DEFINE a AS F32 TENSOR [2, 2] VALUES [1, 2, 3, 4]
/// DEFINE a AS BF16 TENSOR [1, 3, 32, 32] RANDOM [-100, 100] SEED 0
pub fn handle_define(db: &mut TensorDb, line: &str, line_no: usize) -> Result<DslOutput, DslError> {
    let parse_err = |msg: String| DslError::Parse { line: line_no, msg };

    // Quitamos el prefijo DEFINE
    let rest = line.trim_start_matches("DEFINE").trim();

    // name AS ...
    let parts: Vec<&str> = rest.splitn(2, " AS ").collect();
    if parts.len() != 2 {
        return Err(parse_err(
            "Expected: DEFINE <name> AS [dtype] TENSOR [dims] VALUES [values]".into(),
        ));
    }

    let name = parts[0].trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(parse_err(format!("Invalid tensor name: '{}'", name)));
    }

    // [dtype] TENSOR ...
    let rhs = parts[1].trim();
    let (dtype, tail) = match rhs.split_once("TENSOR") {
        Some((head, tail)) => {
            let head = head.trim();
            let dtype = if head.is_empty() {
                DEFAULT_DTYPE
            } else {
                head.parse::<DType>().map_err(parse_err)?
            };
            (dtype, tail.trim())
        }
        None => {
            return Err(parse_err(
                "Expected: AS TENSOR ... or AS <dtype> TENSOR ...".into(),
            ))
        }
    };

    // tail: [dims] VALUES [...] | [dims] RANDOM [low, high] SEED n
    let (shape_str, source) = split_bracketed(tail).map_err(parse_err)?;
    let dims = parse_usize_list(shape_str).map_err(parse_err)?;
    let shape = Shape::new(dims);

    let engine_err = |e: EngineError| DslError::Engine {
        line: line_no,
        source: e,
    };

    if let Some(values_str) = source.strip_prefix("VALUES") {
        let values = parse_f32_list(values_str).map_err(parse_err)?;
        db.insert_named(name, shape.clone(), dtype, values)
            .map_err(engine_err)?;
    } else if let Some(random_str) = source.strip_prefix("RANDOM") {
        let (range_str, seed_part) = split_bracketed(random_str).map_err(parse_err)?;
        let range = parse_f32_list(range_str).map_err(parse_err)?;
        if range.len() != 2 {
            return Err(parse_err("Expected RANDOM [low, high]".into()));
        }
        let seed = match seed_part.strip_prefix("SEED") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| parse_err(format!("Invalid seed: {}", s.trim())))?,
            None if seed_part.is_empty() => 0,
            None => return Err(parse_err(format!("Unexpected input: {}", seed_part))),
        };
        db.insert_random(name, shape.clone(), dtype, range[0], range[1], seed)
            .map_err(engine_err)?;
    } else {
        return Err(parse_err(
            "Expected: ... [dims] VALUES [values] or ... [dims] RANDOM [low, high] SEED n".into(),
        ));
    }

    Ok(DslOutput::Message(format!(
        "Defined tensor: {} {} {}",
        name, shape, dtype
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;

    fn db() -> TensorDb {
        TensorDb::with_config(EngineConfig::default())
    }

    #[test]
    fn test_define_values_default_dtype() {
        let mut db = db();
        let out = handle_define(&mut db, "DEFINE a AS TENSOR [2] VALUES [1.0, 3.14159]", 1)
            .unwrap();
        assert!(out.to_string().contains("Defined tensor: a"));
        let a = db.get("a").unwrap();
        assert_eq!(a.dtype(), DType::BFloat16);
        // bf16 keeps 8 significant bits
        assert_eq!(a.data()[1], 3.140625);
    }

    #[test]
    fn test_define_random() {
        let mut db = db();
        handle_define(
            &mut db,
            "DEFINE r AS F32 TENSOR [2, 3] RANDOM [-1, 1] SEED 42",
            1,
        )
        .unwrap();
        let r = db.get("r").unwrap();
        assert_eq!(r.dims(), &[2, 3]);
        assert_eq!(r.dtype(), DType::Float32);
        assert!(r.data().iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_define_errors() {
        let mut db = db();
        assert!(matches!(
            handle_define(&mut db, "DEFINE a TENSOR [2] VALUES [1, 2]", 3),
            Err(DslError::Parse { line: 3, .. })
        ));
        assert!(matches!(
            handle_define(&mut db, "DEFINE a AS F64 TENSOR [2] VALUES [1, 2]", 1),
            Err(DslError::Parse { .. })
        ));
        assert!(matches!(
            handle_define(&mut db, "DEFINE a AS TENSOR [3] VALUES [1, 2]", 1),
            Err(DslError::Engine { .. })
        ));
        assert!(matches!(
            handle_define(&mut db, "DEFINE a AS TENSOR [3] RANDOM [1, 1]", 1),
            Err(DslError::Engine { .. })
        ));
    }

    #[test]
    fn test_define_rejects_unrepresentable_input() {
        let mut db = db();
        // range width overflows f32
        assert!(matches!(
            handle_define(&mut db, "DEFINE a AS F32 TENSOR [2] RANDOM [-3e38, 3e38]", 1),
            Err(DslError::Engine { .. })
        ));
        // element count overflows usize
        let err = handle_define(
            &mut db,
            "DEFINE a AS F32 TENSOR [18446744073709551615, 2] VALUES []",
            2,
        )
        .unwrap_err();
        assert_eq!(err.line(), 2);
        assert!(err.to_string().contains("too many elements"));
        assert!(db.get("a").is_err());
    }
}
