use crate::utils::error::{Result, XmlRpcError};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::VecDeque;
use std::fmt;

/// XML-RPC 認得的所有標籤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    MethodCall,
    MethodResponse,
    MethodName,
    Params,
    Param,
    Value,
    Fault,
    Struct,
    Member,
    Name,
    Array,
    Data,
    // data types
    Int,
    Boolean,
    String,
    Double,
    DateTime,
    Base64,
    Nil,
}

impl Tag {
    pub fn from_name(name: &str) -> Result<Self> {
        let tag = match name {
            "methodCall" => Tag::MethodCall,
            "methodResponse" => Tag::MethodResponse,
            "methodName" => Tag::MethodName,
            "params" => Tag::Params,
            "param" => Tag::Param,
            "value" => Tag::Value,
            "fault" => Tag::Fault,
            "struct" => Tag::Struct,
            "member" => Tag::Member,
            "name" => Tag::Name,
            "array" => Tag::Array,
            "data" => Tag::Data,
            "int" | "i4" | "i8" => Tag::Int,
            "boolean" => Tag::Boolean,
            "string" => Tag::String,
            "double" => Tag::Double,
            "dateTime.iso8601" => Tag::DateTime,
            "base64" => Tag::Base64,
            "nil" => Tag::Nil,
            other => return Err(XmlRpcError::decode(format!("Unknown tag <{}>", other))),
        };
        Ok(tag)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tag::MethodCall => "methodCall",
            Tag::MethodResponse => "methodResponse",
            Tag::MethodName => "methodName",
            Tag::Params => "params",
            Tag::Param => "param",
            Tag::Value => "value",
            Tag::Fault => "fault",
            Tag::Struct => "struct",
            Tag::Member => "member",
            Tag::Name => "name",
            Tag::Array => "array",
            Tag::Data => "data",
            Tag::Int => "int",
            Tag::Boolean => "boolean",
            Tag::String => "string",
            Tag::Double => "double",
            Tag::DateTime => "dateTime.iso8601",
            Tag::Base64 => "base64",
            Tag::Nil => "nil",
        }
    }

    pub fn is_data_type(&self) -> bool {
        matches!(
            self,
            Tag::Int
                | Tag::Boolean
                | Tag::String
                | Tag::Double
                | Tag::DateTime
                | Tag::Base64
                | Tag::Nil
                | Tag::Struct
                | Tag::Array
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Start(Tag),
    End(Tag),
    Text(String),
}

impl Token {
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Token::Text(t) if t.trim().is_empty())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Start(tag) => write!(f, "<{}>", tag.name()),
            Token::End(tag) => write!(f, "</{}>", tag.name()),
            Token::Text(text) => write!(f, "\"{}\"", text),
        }
    }
}

fn xml_error(e: impl fmt::Display) -> XmlRpcError {
    XmlRpcError::Xml {
        message: e.to_string(),
    }
}

fn tag_of(raw: &[u8]) -> Result<Tag> {
    Tag::from_name(std::str::from_utf8(raw).map_err(xml_error)?)
}

/// quick-xml 事件之上的拉取式 tokenizer
pub struct Tokens<'a> {
    reader: Reader<&'a [u8]>,
    pending: VecDeque<Token>,
    done: bool,
}

impl<'a> Tokens<'a> {
    pub fn new(xml: &'a str) -> Self {
        Self {
            reader: Reader::from_str(xml),
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// 讀取下一個 token；文件結束時回傳 None
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        if self.pending.is_empty() {
            self.fill()?;
        }
        Ok(self.pending.pop_front())
    }

    /// 跳過空白文字，文件結束視為錯誤
    pub fn expect_significant(&mut self, context: &str) -> Result<Token> {
        loop {
            match self.next_token()? {
                None => {
                    return Err(XmlRpcError::decode(format!(
                        "Unexpected end-of-file in {}",
                        context
                    )))
                }
                Some(tok) if tok.is_blank_text() => continue,
                Some(tok) => return Ok(tok),
            }
        }
    }

    // 讀取一個完整 token，相鄰的文字與 CDATA 合併
    fn fill(&mut self) -> Result<()> {
        let mut text: Option<String> = None;
        while !self.done {
            let event = self.reader.read_event().map_err(xml_error)?;
            match event {
                Event::Text(t) => {
                    let unescaped = t.unescape().map_err(xml_error)?;
                    text.get_or_insert_with(String::new).push_str(&unescaped);
                }
                Event::CData(c) => {
                    let raw = std::str::from_utf8(&c).map_err(xml_error)?;
                    text.get_or_insert_with(String::new).push_str(raw);
                }
                Event::Start(e) => {
                    let tag = tag_of(e.name().as_ref())?;
                    self.flush_text(&mut text);
                    self.pending.push_back(Token::Start(tag));
                    return Ok(());
                }
                Event::Empty(e) => {
                    let tag = tag_of(e.name().as_ref())?;
                    self.flush_text(&mut text);
                    self.pending.push_back(Token::Start(tag));
                    self.pending.push_back(Token::End(tag));
                    return Ok(());
                }
                Event::End(e) => {
                    let tag = tag_of(e.name().as_ref())?;
                    self.flush_text(&mut text);
                    self.pending.push_back(Token::End(tag));
                    return Ok(());
                }
                Event::Eof => self.done = true,
                // 宣告、註解、處理指令與 doctype 一律忽略
                _ => {}
            }
        }
        self.flush_text(&mut text);
        Ok(())
    }

    fn flush_text(&mut self, text: &mut Option<String>) {
        if let Some(t) = text.take() {
            self.pending.push_back(Token::Text(t));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Vec<Token> {
        let mut tokens = Tokens::new(xml);
        let mut out = Vec::new();
        while let Some(tok) = tokens.next_token().unwrap() {
            out.push(tok);
        }
        out
    }

    #[test]
    fn test_empty_element_expands() {
        assert_eq!(
            collect("<value><nil/></value>"),
            vec![
                Token::Start(Tag::Value),
                Token::Start(Tag::Nil),
                Token::End(Tag::Nil),
                Token::End(Tag::Value),
            ]
        );
    }

    #[test]
    fn test_text_is_unescaped_and_merged() {
        assert_eq!(
            collect("<string>a&lt;b<![CDATA[&c]]></string>"),
            vec![
                Token::Start(Tag::String),
                Token::Text("a<b&c".to_string()),
                Token::End(Tag::String),
            ]
        );
    }

    #[test]
    fn test_declaration_and_comments_skipped() {
        assert_eq!(
            collect("<?xml version=\"1.0\"?><!-- hi --><params></params>"),
            vec![Token::Start(Tag::Params), Token::End(Tag::Params)]
        );
    }

    #[test]
    fn test_i4_maps_to_int_and_unknown_fails() {
        assert_eq!(Tag::from_name("i4").unwrap(), Tag::Int);
        let err = Tag::from_name("ethodResponse").unwrap_err();
        assert!(err.to_string().contains("Unknown tag <ethodResponse>"));
    }
}
