use crate::core::token::{Tag, Token, Tokens};
use crate::domain::model::{Fault, MethodCall, MethodResponse, Payload, Value};
use crate::utils::error::{Result, XmlRpcError};
use base64::Engine;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

pub const ISO8601_LAYOUT: &str = "%Y%m%dT%H:%M:%S";
const ISO8601_DASHED_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// `<value>` 最多可巢狀的層數
pub const MAX_VALUE_DEPTH: usize = 256;

/// 將 XML 文件解碼為請求或回應
pub fn decode(xml: &str) -> Result<Payload> {
    let mut tokens = Tokens::new(xml);

    let payload = match tokens.expect_significant("document")? {
        Token::Start(Tag::MethodCall) => Payload::Call(parse_call(&mut tokens)?),
        Token::Start(Tag::MethodResponse) => Payload::Response(parse_response(&mut tokens)?),
        other => {
            return Err(XmlRpcError::decode(format!(
                "Unrecognized document root {}",
                other
            )))
        }
    };

    while let Some(tok) = tokens.next_token()? {
        if !tok.is_blank_text() {
            return Err(XmlRpcError::decode(format!(
                "Unexpected {} after end of document",
                tok
            )));
        }
    }

    Ok(payload)
}

/// 解碼回應；收到請求文件視為錯誤
pub fn decode_response(xml: &str) -> Result<MethodResponse> {
    match decode(xml)? {
        Payload::Response(response) => Ok(response),
        Payload::Call(call) => Err(XmlRpcError::decode(format!(
            "Expected <methodResponse>, got <methodCall> for \"{}\"",
            call.method_name
        ))),
    }
}

fn parse_call(tokens: &mut Tokens<'_>) -> Result<MethodCall> {
    let mut method_name: Option<String> = None;
    let mut params: Option<Vec<Value>> = None;

    loop {
        match tokens.expect_significant("methodCall")? {
            Token::Start(Tag::MethodName) => {
                let name = read_text(tokens, Tag::MethodName)?;
                if let Some(existing) = &method_name {
                    return Err(XmlRpcError::decode(format!(
                        "Multiple method names (\"{}\" and \"{}\")",
                        existing, name
                    )));
                }
                method_name = Some(name.trim().to_string());
            }
            Token::Start(Tag::Params) => {
                if params.is_some() {
                    return Err(XmlRpcError::decode("Multiple <params> elements"));
                }
                params = Some(parse_params(tokens)?);
            }
            Token::End(Tag::MethodCall) => break,
            other => {
                return Err(XmlRpcError::decode(format!(
                    "Unexpected methodCall token {}",
                    other
                )))
            }
        }
    }

    let method_name =
        method_name.ok_or_else(|| XmlRpcError::decode("Missing <methodName> in <methodCall>"))?;
    Ok(MethodCall {
        method_name,
        params: params.unwrap_or_default(),
    })
}

fn parse_response(tokens: &mut Tokens<'_>) -> Result<MethodResponse> {
    let response = match tokens.expect_significant("methodResponse")? {
        Token::Start(Tag::Params) => MethodResponse::Params(parse_params(tokens)?),
        Token::Start(Tag::Fault) => {
            let value = parse_value_element(tokens, 0)?;
            expect_end(tokens, Tag::Fault)?;
            MethodResponse::Fault(to_fault(value)?)
        }
        // <methodResponse/> 或空的回應
        Token::End(Tag::MethodResponse) => return Ok(MethodResponse::Params(Vec::new())),
        other => {
            return Err(XmlRpcError::decode(format!(
                "Unexpected methodResponse token {}",
                other
            )))
        }
    };
    expect_end(tokens, Tag::MethodResponse)?;
    Ok(response)
}

fn parse_params(tokens: &mut Tokens<'_>) -> Result<Vec<Value>> {
    let mut params = Vec::new();
    loop {
        match tokens.expect_significant("params")? {
            Token::Start(Tag::Param) => {
                params.push(parse_value_element(tokens, 0)?);
                expect_end(tokens, Tag::Param)?;
            }
            Token::End(Tag::Params) => return Ok(params),
            other => {
                return Err(XmlRpcError::decode(format!(
                    "Unexpected params token {}",
                    other
                )))
            }
        }
    }
}

fn to_fault(value: Value) -> Result<Fault> {
    let members = match value {
        Value::Struct(members) => members,
        other => {
            return Err(XmlRpcError::decode(format!(
                "Fault value must be a struct, got {}",
                other.type_name()
            )))
        }
    };

    let code = members
        .get("faultCode")
        .and_then(Value::as_i64)
        .and_then(|c| i32::try_from(c).ok())
        .ok_or_else(|| XmlRpcError::decode("Fault is missing an integer faultCode"))?;
    let message = members
        .get("faultString")
        .and_then(Value::as_str)
        .ok_or_else(|| XmlRpcError::decode("Fault is missing a string faultString"))?;

    Ok(Fault::new(code, message))
}

fn parse_value_element(tokens: &mut Tokens<'_>, depth: usize) -> Result<Value> {
    match tokens.expect_significant("value")? {
        Token::Start(Tag::Value) => parse_value_body(tokens, depth),
        other => Err(XmlRpcError::decode(format!(
            "Expected <value>, got {}",
            other
        ))),
    }
}

// 已讀過 <value>，一直處理到 </value>
fn parse_value_body(tokens: &mut Tokens<'_>, depth: usize) -> Result<Value> {
    if depth >= MAX_VALUE_DEPTH {
        return Err(XmlRpcError::decode("Value nesting too deep"));
    }
    let mut text = String::new();
    let mut typed: Option<Value> = None;

    loop {
        let tok = tokens
            .next_token()?
            .ok_or_else(|| XmlRpcError::decode("Unexpected end-of-file in value"))?;
        match tok {
            Token::Text(t) => {
                if typed.is_some() && !t.trim().is_empty() {
                    return Err(XmlRpcError::decode(format!(
                        "Unexpected text \"{}\" after typed value",
                        t
                    )));
                }
                text.push_str(&t);
            }
            Token::Start(tag) if tag.is_data_type() => {
                if typed.is_some() {
                    return Err(XmlRpcError::decode(
                        "Found multiple type elements in one <value>",
                    ));
                }
                if !text.trim().is_empty() {
                    return Err(XmlRpcError::decode(format!(
                        "Unexpected text \"{}\" before <{}>",
                        text,
                        tag.name()
                    )));
                }
                typed = Some(parse_data(tokens, tag, depth)?);
            }
            Token::End(Tag::Value) => break,
            other => {
                return Err(XmlRpcError::decode(format!(
                    "Unexpected value token {}",
                    other
                )))
            }
        }
    }

    // 沒有型別標籤的值一律當作字串
    Ok(typed.unwrap_or(Value::String(text)))
}

fn parse_data(tokens: &mut Tokens<'_>, tag: Tag, depth: usize) -> Result<Value> {
    match tag {
        Tag::Struct => parse_struct(tokens, depth),
        Tag::Array => parse_array(tokens, depth),
        Tag::Nil => {
            expect_end(tokens, Tag::Nil)?;
            Ok(Value::Nil)
        }
        Tag::String => Ok(Value::String(read_text(tokens, Tag::String)?)),
        Tag::Int => {
            let raw = read_text(tokens, Tag::Int)?;
            raw.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| XmlRpcError::decode(format!("Bad <int> value \"{}\": {}", raw, e)))
        }
        Tag::Boolean => {
            let raw = read_text(tokens, Tag::Boolean)?;
            match raw.trim() {
                "1" => Ok(Value::Boolean(true)),
                "0" => Ok(Value::Boolean(false)),
                _ => Err(XmlRpcError::decode(format!(
                    "Bad <boolean> value \"{}\"",
                    raw
                ))),
            }
        }
        Tag::Double => {
            let raw = read_text(tokens, Tag::Double)?;
            raw.trim()
                .parse::<f64>()
                .map(Value::Double)
                .map_err(|e| XmlRpcError::decode(format!("Bad <double> value \"{}\": {}", raw, e)))
        }
        Tag::DateTime => {
            let raw = read_text(tokens, Tag::DateTime)?;
            let trimmed = raw.trim();
            NaiveDateTime::parse_from_str(trimmed, ISO8601_LAYOUT)
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, ISO8601_DASHED_LAYOUT))
                .map(Value::DateTime)
                .map_err(|e| {
                    XmlRpcError::decode(format!("Bad <dateTime.iso8601> value \"{}\": {}", raw, e))
                })
        }
        Tag::Base64 => {
            let raw = read_text(tokens, Tag::Base64)?;
            let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
            base64::engine::general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map(Value::Base64)
                .map_err(|e| XmlRpcError::decode(format!("Bad <base64> value: {}", e)))
        }
        other => Err(XmlRpcError::decode(format!(
            "Unknown type <{}> in value",
            other.name()
        ))),
    }
}

fn parse_struct(tokens: &mut Tokens<'_>, depth: usize) -> Result<Value> {
    let mut members = BTreeMap::new();
    loop {
        match tokens.expect_significant("struct")? {
            Token::Start(Tag::Member) => {
                match tokens.expect_significant("member")? {
                    Token::Start(Tag::Name) => {}
                    other => {
                        return Err(XmlRpcError::decode(format!(
                            "Expected <name> in member, got {}",
                            other
                        )))
                    }
                }
                let name = read_text(tokens, Tag::Name)?;
                let value = parse_value_element(tokens, depth + 1)?;
                expect_end(tokens, Tag::Member)?;
                members.insert(name, value);
            }
            Token::End(Tag::Struct) => return Ok(Value::Struct(members)),
            other => {
                return Err(XmlRpcError::decode(format!(
                    "Unexpected struct token {}",
                    other
                )))
            }
        }
    }
}

fn parse_array(tokens: &mut Tokens<'_>, depth: usize) -> Result<Value> {
    let mut items = Vec::new();
    match tokens.expect_significant("array")? {
        Token::Start(Tag::Data) => {}
        Token::End(Tag::Array) => return Ok(Value::Array(items)),
        other => {
            return Err(XmlRpcError::decode(format!(
                "Expected <data> in array, got {}",
                other
            )))
        }
    }

    loop {
        match tokens.expect_significant("array data")? {
            Token::Start(Tag::Value) => items.push(parse_value_body(tokens, depth + 1)?),
            Token::End(Tag::Data) => break,
            other => {
                return Err(XmlRpcError::decode(format!(
                    "Unexpected array token {}",
                    other
                )))
            }
        }
    }
    expect_end(tokens, Tag::Array)?;
    Ok(Value::Array(items))
}

// 讀取純文字直到指定的結束標籤
fn read_text(tokens: &mut Tokens<'_>, tag: Tag) -> Result<String> {
    let mut text = String::new();
    loop {
        let tok = tokens.next_token()?.ok_or_else(|| {
            XmlRpcError::decode(format!("Unexpected end-of-file in <{}>", tag.name()))
        })?;
        match tok {
            Token::Text(t) => text.push_str(&t),
            Token::End(end) if end == tag => return Ok(text),
            other => {
                return Err(XmlRpcError::decode(format!(
                    "Unexpected token {} in <{}>",
                    other,
                    tag.name()
                )))
            }
        }
    }
}

fn expect_end(tokens: &mut Tokens<'_>, tag: Tag) -> Result<()> {
    match tokens.expect_significant(tag.name())? {
        Token::End(end) if end == tag => Ok(()),
        other => Err(XmlRpcError::decode(format!(
            "Expected </{}>, got {}",
            tag.name(),
            other
        ))),
    }
}
