//! In-memory structure of one compiled unit
//!
//! The surrounding pipeline owns loading and re-emission; this module only
//! models what the rewrite engine needs to walk: methods, their instruction
//! streams, and the literal constants those instructions load.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// Literal operand of a constant-load instruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Constant {
    Str(String),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    /// Class/type reference
    Type(String),
}

impl Constant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    /// Load a literal constant onto the stack
    Ldc { constant: Constant },
    Invoke {
        owner: String,
        name: String,
        descriptor: String,
    },
    /// Branch to an instruction index within the same method
    Jump { target: usize },
    Return,
    /// Any other opcode, carried through opaquely
    Raw { opcode: u8, operands: Vec<u8> },
}

impl Instruction {
    pub fn ldc(constant: Constant) -> Self {
        Instruction::Ldc { constant }
    }

    pub fn ldc_str(value: impl Into<String>) -> Self {
        Instruction::Ldc {
            constant: Constant::Str(value.into()),
        }
    }

    /// String literal loaded by this instruction, if any
    pub fn string_literal(&self) -> Option<&str> {
        match self {
            Instruction::Ldc { constant } => constant.as_str(),
            _ => None,
        }
    }

    /// Discriminant-only comparison: same opcode kind, operands ignored for `Ldc`
    pub fn same_shape(&self, other: &Instruction) -> bool {
        match (self, other) {
            (Instruction::Ldc { constant: a }, Instruction::Ldc { constant: b }) => {
                std::mem::discriminant(a) == std::mem::discriminant(b)
            }
            _ => self == other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub descriptor: String,
    pub instructions: Vec<Instruction>,
}

impl Method {
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            instructions: Vec::new(),
        }
    }

    pub fn with_instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub name: String,
    pub methods: Vec<Method>,
}

impl CodeArtifact {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Parse and validate an artifact from its JSON form
    pub fn from_json(data: &[u8]) -> Result<Self, TransformError> {
        let artifact: CodeArtifact = serde_json::from_slice(data)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, TransformError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Check that every jump lands inside its own method
    pub fn validate(&self) -> Result<(), TransformError> {
        for method in &self.methods {
            let len = method.instructions.len();
            for (offset, insn) in method.instructions.iter().enumerate() {
                if let Instruction::Jump { target } = insn {
                    if *target >= len {
                        return Err(TransformError::InvalidArtifact {
                            artifact: self.name.clone(),
                            reason: format!(
                                "{}{} jumps from {} to {} past end ({} instructions)",
                                method.name, method.descriptor, offset, target, len
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// All string literals loaded anywhere in the artifact, in instruction order
    pub fn string_constants(&self) -> impl Iterator<Item = &str> {
        self.methods
            .iter()
            .flat_map(|m| m.instructions.iter())
            .filter_map(Instruction::string_literal)
    }

    pub fn instruction_count(&self) -> usize {
        self.methods.iter().map(|m| m.instructions.len()).sum()
    }

    /// True when `other` has the same methods and instruction shapes,
    /// differing at most in constant operands
    pub fn same_shape(&self, other: &CodeArtifact) -> bool {
        self.methods.len() == other.methods.len()
            && self.methods.iter().zip(&other.methods).all(|(a, b)| {
                a.name == b.name
                    && a.descriptor == b.descriptor
                    && a.instructions.len() == b.instructions.len()
                    && a.instructions
                        .iter()
                        .zip(&b.instructions)
                        .all(|(x, y)| x.same_shape(y))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CodeArtifact {
        CodeArtifact::new("net/minecraft/client/SkinLoader").with_method(
            Method::new("load", "(Ljava/lang/String;)V").with_instructions(vec![
                Instruction::ldc_str("http://skins.minecraft.net/MinecraftSkins/"),
                Instruction::ldc(Constant::Int(42)),
                Instruction::Jump { target: 3 },
                Instruction::Return,
            ]),
        )
    }

    #[test]
    fn test_string_constants() {
        let artifact = sample();
        let literals: Vec<_> = artifact.string_constants().collect();
        assert_eq!(literals, vec!["http://skins.minecraft.net/MinecraftSkins/"]);
        assert_eq!(artifact.instruction_count(), 4);
    }

    #[test]
    fn test_json_round_trip_validates() {
        let artifact = sample();
        let json = artifact.to_json().unwrap();
        let parsed = CodeArtifact::from_json(&json).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn test_jump_out_of_range_rejected() {
        let artifact = CodeArtifact::new("Broken").with_method(
            Method::new("run", "()V").with_instructions(vec![Instruction::Jump { target: 5 }]),
        );
        let json = serde_json::to_vec(&artifact).unwrap();

        let err = CodeArtifact::from_json(&json).unwrap_err();
        assert!(matches!(err, TransformError::InvalidArtifact { .. }));
    }

    #[test]
    fn test_same_shape_ignores_string_operands() {
        let a = sample();
        let mut b = sample();
        b.methods[0].instructions[0] = Instruction::ldc_str("http://127.0.0.1:1234");
        assert!(a.same_shape(&b));

        b.methods[0].instructions[1] = Instruction::ldc_str("not an int");
        assert!(!a.same_shape(&b));
    }
}
