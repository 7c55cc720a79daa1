//! Tagged scalar encoding. Every operand picks the narrowest tag that
//! reproduces it exactly.

use chrono::DateTime;
use half::f16;

use super::wire::{Reader, Writer};
use super::CodecError;
use crate::model::ConditionValue;

const TAG_U8: u8 = 1;
const TAG_I8: u8 = 2;
const TAG_UVARINT: u8 = 3;
const TAG_SVARINT: u8 = 4;
const TAG_F16: u8 = 5;
const TAG_F32: u8 = 6;
const TAG_F64: u8 = 7;
const TAG_STR: u8 = 8;
const TAG_BOOL: u8 = 9;
const TAG_TIMESTAMP: u8 = 10;

pub fn write_value(w: &mut Writer, value: &ConditionValue) -> Result<(), CodecError> {
    match value {
        ConditionValue::Int(i) => write_int(w, *i),
        ConditionValue::Float(f) => write_float(w, *f)?,
        ConditionValue::Str(s) => {
            w.u8(TAG_STR);
            w.str(s);
        }
        ConditionValue::Bool(b) => {
            w.u8(TAG_BOOL);
            w.u8(u8::from(*b));
        }
        ConditionValue::Timestamp(t) => {
            w.u8(TAG_TIMESTAMP);
            w.zigzag(t.timestamp_millis());
        }
    }
    Ok(())
}

fn write_int(w: &mut Writer, i: i64) {
    if let Ok(b) = u8::try_from(i) {
        w.u8(TAG_U8);
        w.u8(b);
    } else if let Ok(b) = i8::try_from(i) {
        w.u8(TAG_I8);
        w.i8(b);
    } else if i >= 0 {
        w.u8(TAG_UVARINT);
        w.varint(i as u64);
    } else {
        w.u8(TAG_SVARINT);
        w.zigzag(i);
    }
}

fn write_float(w: &mut Writer, f: f64) -> Result<(), CodecError> {
    let half = f16::from_f64(f);
    if half.to_f64() == f {
        w.u8(TAG_F16);
        w.bytes(&half.to_bits().to_be_bytes());
        return Ok(());
    }
    let single = f as f32;
    if single as f64 == f {
        w.u8(TAG_F32);
        w.bytes(&single.to_be_bytes());
        return Ok(());
    }
    if f.is_nan() {
        return Err(CodecError::InexactFloat(f));
    }
    w.u8(TAG_F64);
    w.bytes(&f.to_be_bytes());
    Ok(())
}

pub fn read_value(r: &mut Reader<'_>) -> Result<ConditionValue, CodecError> {
    let offset = r.offset();
    let tag = r.u8()?;
    let value = match tag {
        TAG_U8 => ConditionValue::Int(r.u8()? as i64),
        TAG_I8 => ConditionValue::Int(r.i8()? as i64),
        TAG_UVARINT => {
            let v = r.varint()?;
            ConditionValue::Int(
                i64::try_from(v).map_err(|_| CodecError::VarintOverflow { offset: offset + 1 })?,
            )
        }
        TAG_SVARINT => ConditionValue::Int(r.zigzag()?),
        TAG_F16 => ConditionValue::Float(f16::from_bits(u16::from_be_bytes(r.array()?)).to_f64()),
        TAG_F32 => ConditionValue::Float(f32::from_be_bytes(r.array()?) as f64),
        TAG_F64 => ConditionValue::Float(f64::from_be_bytes(r.array()?)),
        TAG_STR => ConditionValue::Str(r.str()?),
        TAG_BOOL => ConditionValue::Bool(read_bool(r)?),
        TAG_TIMESTAMP => {
            let millis = r.zigzag()?;
            let t = DateTime::from_timestamp_millis(millis)
                .ok_or(CodecError::InvalidTimestamp { offset: offset + 1 })?;
            ConditionValue::Timestamp(t)
        }
        other => return Err(CodecError::UnknownTag { offset, tag: other }),
    };
    Ok(value)
}

pub fn read_bool(r: &mut Reader<'_>) -> Result<bool, CodecError> {
    let offset = r.offset();
    match r.u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CodecError::UnknownTag { offset, tag: other }),
    }
}
