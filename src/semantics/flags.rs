//! Flag declarations and forced flag effects for one opcode.

use bitflags::bitflags;
use smallvec::SmallVec;

use super::descriptor::OpcodeDescriptor;
use super::error::{GenerationError, SemanticError};
use super::render::render;
use super::resolver::{Resolved, Resolver};
use super::target::{self, TargetExpr};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FlagEffects: u8 {
        const TESTED = 0b0001;
        const UPDATED = 0b0010;
        const CLEARED = 0b0100;
        const FIXED = 0b1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    Tested,
    Updated,
    Cleared,
    Fixed,
}

impl FlagKind {
    /// Declaration order within a block.
    pub const ALL: [FlagKind; 4] = [
        FlagKind::Tested,
        FlagKind::Updated,
        FlagKind::Cleared,
        FlagKind::Fixed,
    ];

    pub fn setter(self) -> &'static str {
        match self {
            FlagKind::Tested => "SetTestedFlags",
            FlagKind::Updated => "SetUpdatedFlags",
            FlagKind::Cleared => "SetClearedFlags",
            FlagKind::Fixed => "SetFixedFlags",
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            FlagKind::Tested => "test_flags",
            FlagKind::Updated => "update_flags",
            FlagKind::Cleared => "clear_flags",
            FlagKind::Fixed => "set_flags",
        }
    }

    pub fn effect(self) -> FlagEffects {
        match self {
            FlagKind::Tested => FlagEffects::TESTED,
            FlagKind::Updated => FlagEffects::UPDATED,
            FlagKind::Cleared => FlagEffects::CLEARED,
            FlagKind::Fixed => FlagEffects::FIXED,
        }
    }

    /// Value every flag of this kind is forced to, if any.
    pub fn forced_value(self) -> Option<bool> {
        match self {
            FlagKind::Cleared => Some(false),
            FlagKind::Fixed => Some(true),
            FlagKind::Tested | FlagKind::Updated => None,
        }
    }

    fn names(self, desc: &OpcodeDescriptor) -> Option<&[String]> {
        let names = match self {
            FlagKind::Tested => desc.test_flags.as_deref(),
            FlagKind::Updated => desc.update_flags.as_deref(),
            FlagKind::Cleared => desc.clear_flags.as_deref(),
            FlagKind::Fixed => desc.set_flags.as_deref(),
        };
        names.filter(|names| !names.is_empty())
    }
}

/// Resolved flags of one declaration; most opcodes declare only a handful.
pub type FlagList = SmallVec<[TargetExpr; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagStatement {
    /// `rInsn.Set*Flags(A | B);`
    Declare { kind: FlagKind, flags: FlagList },
    /// Forced one-bit assignment appended to the effect list.
    Force(TargetExpr),
}

impl FlagStatement {
    pub fn render(&self) -> String {
        match self {
            FlagStatement::Declare { kind, flags } => {
                let args: Vec<String> = flags.iter().map(render).collect();
                format!("rInsn.{}({});", kind.setter(), args.join(" | "))
            }
            FlagStatement::Force(effect) => format!("AllExpr.push_back({});", render(effect)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagPreamble {
    pub statements: Vec<FlagStatement>,
    pub effects: FlagEffects,
}

impl FlagPreamble {
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn forced(&self) -> impl Iterator<Item = &TargetExpr> + '_ {
        self.statements.iter().filter_map(|stmt| match stmt {
            FlagStatement::Force(effect) => Some(effect),
            FlagStatement::Declare { .. } => None,
        })
    }
}

/// Builds the flag preamble of `desc`; an absent or empty list emits nothing.
pub fn emit_flags(
    desc: &OpcodeDescriptor,
    resolver: &Resolver<'_>,
) -> Result<FlagPreamble, GenerationError> {
    let mut preamble = FlagPreamble::default();

    for kind in FlagKind::ALL {
        let Some(names) = kind.names(desc) else {
            continue;
        };
        let flags = names
            .iter()
            .map(|name| resolve_flag(resolver, name))
            .collect::<Result<FlagList, _>>()
            .map_err(|err| {
                GenerationError::new(
                    desc.identity(),
                    format!("{}: {}", kind.field(), names.join(", ")),
                    err,
                )
            })?;

        let forced: Vec<TargetExpr> = match kind.forced_value() {
            Some(value) => flags
                .iter()
                .map(|flag| target::force_flag(flag.clone(), value))
                .collect(),
            None => Vec::new(),
        };

        preamble.statements.push(FlagStatement::Declare { kind, flags });
        preamble
            .statements
            .extend(forced.into_iter().map(FlagStatement::Force));
        preamble.effects |= kind.effect();
    }

    Ok(preamble)
}

fn resolve_flag(resolver: &Resolver<'_>, name: &str) -> Result<TargetExpr, SemanticError> {
    match resolver.resolve(name)? {
        Resolved::Value(value) => Ok(value),
        Resolved::Function(_) => Err(SemanticError::Resolution(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantics::resolver::IdentifierTable;

    fn table() -> IdentifierTable {
        [
            ("cf", "X86_FlCf"),
            ("zf", "X86_FlZf"),
            ("sf", "X86_FlSf"),
            ("of", "X86_FlOf"),
            ("df", "X86_FlDf"),
        ]
        .into_iter()
        .collect()
    }

    fn rendered(preamble: &FlagPreamble) -> Vec<String> {
        preamble.statements.iter().map(FlagStatement::render).collect()
    }

    #[test]
    fn declares_in_fixed_kind_order() {
        let table = table();
        let desc = OpcodeDescriptor::new("adc")
            .with_update_flags(["zf", "sf"])
            .with_test_flags(["cf"]);
        let preamble = emit_flags(&desc, &Resolver::new(&table)).unwrap();
        assert_eq!(
            rendered(&preamble),
            [
                "rInsn.SetTestedFlags(X86_FlCf);",
                "rInsn.SetUpdatedFlags(X86_FlZf | X86_FlSf);",
            ]
        );
        assert_eq!(preamble.effects, FlagEffects::TESTED | FlagEffects::UPDATED);
        assert_eq!(preamble.forced().count(), 0);
    }

    #[test]
    fn cleared_and_set_flags_are_forced_after_their_declaration() {
        let table = table();
        let desc = OpcodeDescriptor::new("mix")
            .with_set_flags(["df"])
            .with_clear_flags(["cf", "of"]);
        let preamble = emit_flags(&desc, &Resolver::new(&table)).unwrap();
        let lines = rendered(&preamble);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "rInsn.SetClearedFlags(X86_FlCf | X86_FlOf);");
        assert!(lines[1].contains("Expr::MakeIdentifier(X86_FlCf, &m_CpuInfo)"));
        assert!(lines[1].ends_with("Expr::MakeConstant(ConstantExpression::Const1Bit, 0x0)));"));
        assert!(lines[2].contains("X86_FlOf"));
        assert_eq!(lines[3], "rInsn.SetFixedFlags(X86_FlDf);");
        assert!(lines[4].ends_with("Expr::MakeConstant(ConstantExpression::Const1Bit, 0x1)));"));
        assert_eq!(preamble.effects, FlagEffects::CLEARED | FlagEffects::FIXED);
    }

    #[test]
    fn declaration_keeps_resolved_flags_in_order() {
        let table = table();
        let desc = OpcodeDescriptor::new("add").with_update_flags(["cf", "zf", "sf", "of", "df"]);
        let preamble = emit_flags(&desc, &Resolver::new(&table)).unwrap();
        let FlagStatement::Declare { kind, flags } = &preamble.statements[0] else {
            panic!("expected declaration");
        };
        assert_eq!(*kind, FlagKind::Updated);
        let names: Vec<String> = flags.iter().map(render).collect();
        assert_eq!(names, ["X86_FlCf", "X86_FlZf", "X86_FlSf", "X86_FlOf", "X86_FlDf"]);
    }

    #[test]
    fn empty_lists_emit_nothing() {
        let table = table();
        let desc = OpcodeDescriptor::new("nop").with_update_flags(Vec::<String>::new());
        let preamble = emit_flags(&desc, &Resolver::new(&table)).unwrap();
        assert!(preamble.is_empty());
        assert!(preamble.effects.is_empty());
    }

    #[test]
    fn flags_may_name_pseudo_registers() {
        let table = IdentifierTable::new();
        let desc = OpcodeDescriptor::new("pushf").with_test_flags(["flag"]);
        let preamble = emit_flags(&desc, &Resolver::new(&table)).unwrap();
        assert_eq!(
            rendered(&preamble),
            ["rInsn.SetTestedFlags(m_CpuInfo.GetRegisterByType(CpuInformation::FlagRegister, rInsn.GetMode()));"]
        );
    }

    #[test]
    fn unknown_flag_reports_declaration() {
        let table = table();
        let desc = OpcodeDescriptor::new("bad").with_update_flags(["zf", "pf"]);
        let err = emit_flags(&desc, &Resolver::new(&table)).unwrap_err();
        assert_eq!(err.opcode, "bad");
        assert_eq!(err.text, "update_flags: zf, pf");
        assert_eq!(err.source, SemanticError::Resolution("pf".into()));
    }

    #[test]
    fn pseudo_function_is_not_a_flag() {
        let table = table();
        let desc = OpcodeDescriptor::new("bad").with_set_flags(["swap"]);
        let err = emit_flags(&desc, &Resolver::new(&table)).unwrap_err();
        assert_eq!(err.source, SemanticError::Resolution("swap".into()));
    }
}
