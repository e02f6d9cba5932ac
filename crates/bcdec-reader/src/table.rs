//! Template table decoding

use std::io::Read;

use bcdec_bytecode::{TableKey, TableValue, TemplateTable};

use crate::decoder::Session;
use crate::error::{DecodeError, ErrorKind, Result};

/// Template value discriminants
const KTAB_NIL: u32 = 0;
const KTAB_FALSE: u32 = 1;
const KTAB_TRUE: u32 = 2;
const KTAB_INT: u32 = 3;
const KTAB_NUM: u32 = 4;
const KTAB_STR: u32 = 5;

impl<R: Read> Session<'_, R> {
    /// Decode a template table: hash length, array length, array values,
    /// then key/value pairs.
    pub(crate) fn read_template_table(&mut self) -> Result<TemplateTable> {
        let hash_len = self.cursor.read_varint()? as usize;
        let array_len = self.cursor.read_varint()? as usize;
        let mut table =
            TemplateTable::with_capacity(self.capacity_hint(array_len), self.capacity_hint(hash_len));

        for _ in 0..array_len {
            let value = self.read_table_value()?;
            table.array.push(value);
        }
        for _ in 0..hash_len {
            let at = self.cursor.position();
            let key = TableKey::from_value(self.read_table_value()?)
                .ok_or_else(|| DecodeError::new(ErrorKind::InvalidKey, at))?;
            let value = self.read_table_value()?;
            table.insert(key, value);
        }
        Ok(table)
    }

    fn read_table_value(&mut self) -> Result<TableValue> {
        let tp = self.cursor.read_varint()?;
        Ok(match tp {
            KTAB_NIL => TableValue::Nil,
            KTAB_FALSE => TableValue::False,
            KTAB_TRUE => TableValue::True,
            KTAB_INT => TableValue::Int(self.cursor.read_varint()? as i32),
            KTAB_NUM => TableValue::Num(f64::from_bits(self.read_u64()?)),
            _ => TableValue::Str(self.read_masked_string((tp - KTAB_STR) as usize)?),
        })
    }
}
