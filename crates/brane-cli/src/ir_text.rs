//! Human-readable IR listings for `brane dump`.

use brane_ir::{IRScript, ValueIndex, ValueStorage};
use brane_vm::{decode_function, Instr};

pub fn format_script(script: &IRScript) -> String {
    let mut out = String::new();

    for def in &script.local_structs {
        let kind = if def.packed { "packed struct" } else { "struct" };
        out.push_str(&format!("{} {} {{\n", kind, def.name));
        for m in &def.members {
            out.push_str(&format!("    {} {} @ {}\n", m.type_name, m.name, m.offset));
        }
        out.push_str("}\n\n");
    }

    for (i, lib) in script.linked_libraries.iter().enumerate() {
        out.push_str(&format!("link [{}] \"{}\"\n", i, lib));
    }
    if !script.linked_libraries.is_empty() {
        out.push('\n');
    }

    for func in &script.local_functions {
        out.push_str(&format!("{} {}\n", func.return_type, func.name));
        if !func.constants.is_empty() {
            out.push_str("  constants:\n");
            for (i, c) in func.constants.iter().enumerate() {
                out.push_str(&format!("    c{}: {}\n", i, c));
            }
        }
        match decode_function(func) {
            Ok(loaded) => {
                for (i, instr) in loaded.code.iter().enumerate() {
                    out.push_str(&format!("  {:>4}  {}\n", i, format_instr(instr)));
                }
            }
            Err(e) => out.push_str(&format!("  <undecodable: {}>\n", e)),
        }
        out.push('\n');
    }

    out
}

fn operand(v: &ValueIndex) -> String {
    match v.storage {
        ValueStorage::Null => "null".to_string(),
        ValueStorage::Reg => format!("r{}", v.index),
        ValueStorage::Ptr => format!("p{}", v.index),
        ValueStorage::StackPtr => format!("sp{}", v.index),
        ValueStorage::DerefPtr => format!("dp{}", v.index),
        ValueStorage::Const => format!("c{}", v.index),
    }
}

fn format_instr(instr: &Instr) -> String {
    match instr {
        Instr::Op2 { op, vt, a, b } => {
            format!("{} {:?} {}, {}", op.name(), vt, operand(a), operand(b))
        }
        Instr::Set { op, dst } => format!("{} {}", op.name(), operand(dst)),
        Instr::Jump { op, target } => format!("{} -> {}", op.name(), target),
        Instr::Mark => "MARK".to_string(),
        Instr::Call {
            function,
            ret,
            args,
        } => {
            let args: Vec<String> = args.iter().map(operand).collect();
            format!(
                "CALL #{} ret={} args=[{}]",
                function,
                operand(ret),
                args.join(", ")
            )
        }
        Instr::ExtCall {
            library,
            name,
            ret,
            args,
        } => {
            let args: Vec<String> = args.iter().map(operand).collect();
            format!(
                "EXT_CALL lib#{} {} ret={} args=[{}]",
                library,
                name,
                operand(ret),
                args.join(", ")
            )
        }
        Instr::Malloc { dst, size } => format!("MALLOC {} size={}", operand(dst), size),
        Instr::Free { ptr } => format!("FREE {}", operand(ptr)),
        Instr::Ret => "RET".to_string(),
        Instr::RetV { vt, src } => format!("RETV {:?} {}", vt, operand(src)),
        Instr::Load {
            vt,
            dst,
            base,
            offset,
        } => format!(
            "LOAD {:?} {} <- {}+{}",
            vt,
            operand(dst),
            operand(base),
            offset
        ),
        Instr::Store {
            vt,
            base,
            offset,
            src,
        } => format!(
            "STORE {:?} {}+{} <- {}",
            vt,
            operand(base),
            offset,
            operand(src)
        ),
    }
}
