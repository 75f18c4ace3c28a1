/*!
# Declaration File Reflection

Reads TypeScript declaration files (`.d.ts`) of the exchange client
libraries and extracts method signatures with their JSDoc:

- [`lexer`]: `logos` tokenizer, JSDoc blocks attached to the next token
- [`parser`]: recursive descent into the [`ast`]
- [`jsdoc`]: description and tag extraction (`nom`)
- [`resolver`]: type expressions to JSON type shapes via a type index
- [`extractor`]: per-class method records, parallel over files
*/

pub mod ast;
pub mod extractor;
pub mod jsdoc;
pub mod lexer;
pub mod parser;
pub mod resolver;

pub use extractor::{
    collect_declaration_files, extract_methods, parse_declaration_file, parse_declaration_files,
    ExtractOptions, KeyStyle, MethodExtractor, ParsedFile,
};
pub use parser::{parse_source, parse_type_str};
pub use resolver::{TypeIndex, TypeResolver, DEFAULT_MAX_DEPTH};
