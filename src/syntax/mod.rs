//! Static syntax metadata for the SM83 dialect: mnemonics, assembler
//! keywords, registers, and the rule families the formatter keys edits off.

use ahash::AHashSet;
use once_cell::sync::Lazy;

/// SM83 instruction mnemonics.
pub const INSTRUCTIONS: &[&str] = &[
    "adc", "add", "and", "bit", "call", "ccf", "cp", "cpl", "daa", "dec", "di", "ei", "halt",
    "inc", "jp", "jr", "ld", "ldh", "nop", "or", "pop", "push", "res", "ret", "reti", "rl", "rla",
    "rlc", "rlca", "rr", "rra", "rrc", "rrca", "rst", "sbc", "scf", "set", "sla", "sra", "srl",
    "stop", "sub", "swap", "xor",
];

/// Assembler directives and built-in function names.
pub const KEYWORDS: &[&str] = &[
    "section", "pops", "pushs", "equ", "set", "equs", "macro", "endm", "shift", "rsset",
    "rsreset", "rb", "rw", "rl", "export", "global", "purge", "db", "dw", "dl", "ds", "incbin",
    "include", "union", "fragment", "nextu", "endu", "printt", "printv", "printi", "printf",
    "rept", "endr", "fail", "warn", "if", "elif", "else", "endc", "opt", "popo", "pusho", "rom0",
    "romx", "vram", "sram", "wram0", "wramx", "oam", "hram", "bank", "align", "load", "charmap",
    "newcharmap", "setcharmap", "pushc", "popc", "endl", "acos", "asin", "atan", "atan2", "cos",
    "def", "div", "high", "low", "isconst", "mul", "sin", "strcat", "strcmp", "strin", "strlen",
    "strlwr", "strsub", "strupr", "tan",
];

pub const REGISTERS: &[&str] = &[
    "a", "f", "b", "c", "d", "e", "h", "l", "af", "bc", "de", "hl", "hli", "hld", "sp", "pc",
];

pub const CONDITION_CODES: &[&str] = &["z", "nz", "nc"];

static RESERVED: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    INSTRUCTIONS
        .iter()
        .chain(KEYWORDS.iter())
        .copied()
        .collect()
});

/// Whether `name` collides with an instruction mnemonic or assembler keyword.
/// Matching is case-insensitive, as the dialect is.
pub fn is_reserved_word(name: &str) -> bool {
    RESERVED.contains(name.to_ascii_lowercase().as_str())
}

/// A family of tokens sharing one capitalization rule path.
///
/// Families are plain declarative data: the formatter walks them in order and
/// tests membership, so adding a family never requires new dispatch code.
pub struct TokenFamily {
    pub rule_path: &'static str,
    pub members: &'static [&'static str],
}

pub const TOKEN_FAMILIES: &[TokenFamily] = &[
    TokenFamily {
        rule_path: "language.instruction",
        members: INSTRUCTIONS,
    },
    TokenFamily {
        rule_path: "language.keyword.preprocessor",
        members: &[
            "include", "incbin", "export", "global", "union", "fragment", "nextu", "endu",
            "printt", "printv", "printi", "printf", "fail", "warn", "if", "elif", "else", "endc",
            "purge", "rept", "endr", "opt", "popo", "pusho", "pops", "pushs", "equ", "equs",
            "macro", "endm", "shift", "charmap", "newcharmap", "setcharmap", "pushc", "popc",
            "load", "endl",
        ],
    },
    TokenFamily {
        rule_path: "language.keyword.datadirective",
        members: &["rsreset", "rsset", "rb", "rw", "rl", "db", "dw", "dl", "ds"],
    },
    TokenFamily {
        rule_path: "language.keyword.sectiondeclaration",
        members: &[
            "section", "rom0", "romx", "vram", "sram", "wram0", "wramx", "oam", "hram", "align",
        ],
    },
    TokenFamily {
        rule_path: "language.keyword.function",
        members: &[
            "mul", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "strcat", "strcmp",
            "strin", "strlen", "strlwr", "strsub", "strupr", "bank", "def", "div", "high", "low",
            "isconst",
        ],
    },
    TokenFamily {
        rule_path: "language.register",
        members: REGISTERS,
    },
    TokenFamily {
        rule_path: "language.conditioncode",
        members: CONDITION_CODES,
    },
];
