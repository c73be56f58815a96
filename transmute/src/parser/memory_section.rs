use std::io::Read;

use crate::error::TranslateError;
use crate::parse_tree::Module;
use crate::parser::language_types::parse_limits;
use crate::parser::utils::read_varuint32;

pub fn parse(reader: &mut dyn Read, module: &mut Module) -> Result<(), TranslateError> {
    let count = read_varuint32(reader)?;
    for _ in 0..count {
        let limits = parse_limits(reader)?;
        if let Some(maximum) = limits.maximum {
            if maximum < limits.initial {
                return Err(TranslateError::invariant(format!(
                    "memory maximum {} is below its initial size {}",
                    maximum, limits.initial
                )));
            }
        }
        module.memories.push(limits);
    }
    if module.memories.len() + module.imported_memories() > 1 {
        return Err(TranslateError::unsupported("more than one memory"));
    }
    debug!("Parsed {} memories", count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_tree::language_types::ResizableLimits;
    use std::io::Cursor;

    #[test]
    fn reads_declared_memory() {
        let mut module = Module::new(1);
        parse(&mut Cursor::new(vec![1, 1, 2, 8]), &mut module).unwrap();
        assert_eq!(module.memories, vec![ResizableLimits { initial: 2, maximum: Some(8) }]);
        assert_eq!(module.memory_limits(), Some(ResizableLimits { initial: 2, maximum: Some(8) }));
    }

    #[test]
    fn maximum_below_initial_is_invalid() {
        let mut module = Module::new(1);
        match parse(&mut Cursor::new(vec![1, 1, 4, 2]), &mut module) {
            Err(TranslateError::InvariantViolation(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn second_memory_is_unsupported() {
        let mut module = Module::new(1);
        match parse(&mut Cursor::new(vec![2, 0, 1, 0, 1]), &mut module) {
            Err(TranslateError::UnsupportedConstruct { .. }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
