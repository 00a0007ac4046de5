use crate::core::unmarshal::ISO8601_LAYOUT;
use crate::domain::model::{Fault, Value};
use crate::utils::error::{Result, XmlRpcError};
use base64::Engine;
use quick_xml::escape::partial_escape;
use std::fmt::Write;

const XML_HEADER: &str = "<?xml version=\"1.0\"?>\n";

/// 編碼一個 `<methodCall>` 請求
pub fn encode_call(method_name: &str, params: &[Value]) -> Result<String> {
    let mut out = String::from(XML_HEADER);
    out.push_str("<methodCall>\n");
    write_fmt(
        &mut out,
        format_args!("<methodName>{}</methodName>\n", partial_escape(method_name)),
    )?;
    write_params(&mut out, params)?;
    out.push_str("</methodCall>\n");
    Ok(out)
}

/// 編碼一個成功的 `<methodResponse>`
pub fn encode_response(params: &[Value]) -> Result<String> {
    let mut out = String::from(XML_HEADER);
    out.push_str("<methodResponse>\n");
    write_params(&mut out, params)?;
    out.push_str("</methodResponse>\n");
    Ok(out)
}

/// 編碼 fault 回應；字串內容皆已跳脫，所以不會失敗
pub fn encode_fault(fault: &Fault) -> String {
    format!(
        "{}<methodResponse>\n<fault>\n<value><struct>\n\
         <member>\n<name>faultCode</name>\n<value><int>{}</int></value>\n</member>\n\
         <member>\n<name>faultString</name>\n<value><string>{}</string></value>\n</member>\n\
         </struct></value>\n</fault>\n</methodResponse>\n",
        XML_HEADER,
        fault.code,
        partial_escape(fault.message.as_str())
    )
}

/// 有方法名稱時編碼為請求，否則編碼為回應
pub fn dumps(params: &[Value], method_name: Option<&str>) -> Result<String> {
    match method_name {
        Some(name) => encode_call(name, params),
        None => encode_response(params),
    }
}

fn write_fmt(out: &mut String, args: std::fmt::Arguments<'_>) -> Result<()> {
    out.write_fmt(args)
        .map_err(|e| XmlRpcError::encode(e.to_string()))
}

fn write_params(out: &mut String, params: &[Value]) -> Result<()> {
    out.push_str("<params>\n");
    for param in params {
        out.push_str("<param>\n<value>");
        write_value(out, param)?;
        out.push_str("</value>\n</param>\n");
    }
    out.push_str("</params>\n");
    Ok(())
}

/// 編碼 `<value>` 內部的型別元素
pub fn write_value(out: &mut String, value: &Value) -> Result<()> {
    match value {
        Value::Boolean(b) => write_fmt(out, format_args!("<boolean>{}</boolean>", u8::from(*b))),
        Value::Int(i) => {
            if i32::try_from(*i).is_ok() {
                write_fmt(out, format_args!("<int>{}</int>", i))
            } else {
                write_fmt(out, format_args!("<i8>{}</i8>", i))
            }
        }
        Value::Double(d) => {
            if !d.is_finite() {
                return Err(XmlRpcError::encode(format!(
                    "Cannot encode non-finite double {}",
                    d
                )));
            }
            // Display for f64 never uses exponent notation
            write_fmt(out, format_args!("<double>{}</double>", d))
        }
        Value::String(s) => write_fmt(
            out,
            format_args!("<string>{}</string>", partial_escape(s.as_str())),
        ),
        Value::DateTime(dt) => write_fmt(
            out,
            format_args!(
                "<dateTime.iso8601>{}</dateTime.iso8601>",
                dt.format(ISO8601_LAYOUT)
            ),
        ),
        Value::Base64(bytes) => write_fmt(
            out,
            format_args!(
                "<base64>{}</base64>",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        ),
        Value::Array(items) => {
            out.push_str("<array><data>\n");
            for item in items {
                out.push_str("<value>");
                write_value(out, item)?;
                out.push_str("</value>\n");
            }
            out.push_str("</data></array>");
            Ok(())
        }
        Value::Struct(members) => {
            out.push_str("<struct>\n");
            for (name, member) in members {
                write_fmt(
                    out,
                    format_args!(
                        "<member>\n<name>{}</name>\n<value>",
                        partial_escape(name.as_str())
                    ),
                )?;
                write_value(out, member)?;
                out.push_str("</value>\n</member>\n");
            }
            out.push_str("</struct>");
            Ok(())
        }
        Value::Nil => {
            out.push_str("<nil/>");
            Ok(())
        }
    }
}
