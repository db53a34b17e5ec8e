//! 从请求文本中取出 `subscribeEmailToNewsletter` 的参数
//!
//! 请求可以包含多个操作,执行的那个必须是只选中这一个字段的 mutation;
//! `email` 可以是字符串字面量或变量

pub const SUBSCRIBE_FIELD: &str = "subscribeEmailToNewsletter";

#[derive(Debug, PartialEq, Eq)]
pub struct SubscribeMutation {
    /// 响应里 `data` 下使用的键
    pub response_key: String,
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("Syntax Error: {0}")]
    Syntax(String),
    #[error("Only mutation operations are supported.")]
    NotAMutation,
    #[error("Cannot query field \"{0}\" on type \"Mutation\".")]
    UnknownField(String),
    #[error("Unknown argument \"{0}\" on field \"Mutation.subscribeEmailToNewsletter\".")]
    UnknownArgument(String),
    #[error("Variable \"${0}\" got invalid value; String cannot represent a non string value.")]
    InvalidVariable(String),
    #[error("Unknown operation named \"{0}\".")]
    UnknownOperation(String),
    #[error("Must provide operation name if query contains multiple operations.")]
    MissingOperationName,
    #[error("Only one \"subscribeEmailToNewsletter\" field can be selected.")]
    MultipleFields,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Str(String),
    Punct(char),
    Other(String),
}

fn tokenize(source: &str) -> Result<Vec<Token>, OperationError> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            // 逗号在 GraphQL 中和空白一样
            c if c.is_whitespace() || c == ',' || c == '\u{feff}' => {
                chars.next();
            }
            '#' => {
                while let Some(c) = chars.next() {
                    if c == '\n' || c == '\r' {
                        break;
                    }
                }
            }
            '"' => {
                chars.next();
                tokens.push(Token::Str(read_string(&mut chars)?));
            }
            '{' | '}' | '(' | ')' | ':' | '$' | '!' | '=' | '[' | ']' | '@' => {
                chars.next();
                tokens.push(Token::Punct(c));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(name));
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                let mut other = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '+' {
                        other.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Other(other));
            }
            other => {
                return Err(OperationError::Syntax(format!(
                    "Unexpected character \"{}\".",
                    other
                )));
            }
        }
    }
    Ok(tokens)
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<String, OperationError> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None | Some('\n') | Some('\r') => {
                return Err(OperationError::Syntax("Unterminated string.".into()));
            }
            Some('"') => return Ok(value),
            Some('\\') => {
                let escaped = match chars.next() {
                    Some('"') => '"',
                    Some('\\') => '\\',
                    Some('/') => '/',
                    Some('b') => '\u{8}',
                    Some('f') => '\u{c}',
                    Some('n') => '\n',
                    Some('r') => '\r',
                    Some('t') => '\t',
                    Some('u') => {
                        let hex: String = chars.by_ref().take(4).collect();
                        u32::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == 4)
                            .and_then(char::from_u32)
                            .ok_or_else(|| {
                                OperationError::Syntax(format!(
                                    "Invalid Unicode escape sequence: \"\\u{}\".",
                                    hex
                                ))
                            })?
                    }
                    other => {
                        return Err(OperationError::Syntax(format!(
                            "Invalid character escape sequence: \"\\{}\".",
                            other.map(String::from).unwrap_or_default()
                        )));
                    }
                };
                value.push(escaped);
            }
            Some(c) => value.push(c),
        }
    }
}

struct Parser {
    tokens: std::vec::IntoIter<Token>,
}

/// 参数值只保留订阅字段用得到的几种,其余的在使用时报错
#[derive(Debug)]
enum ArgumentValue {
    Str(String),
    Null,
    Variable(String),
    Unsupported(OperationError),
}

#[derive(Debug)]
struct Field {
    response_key: String,
    name: String,
    arguments: Vec<(String, ArgumentValue)>,
}

#[derive(Debug)]
struct Operation {
    kind: String,
    name: Option<String>,
    fields: Vec<Field>,
}

impl Parser {
    fn next(&mut self) -> Result<Token, OperationError> {
        self.tokens
            .next()
            .ok_or_else(|| OperationError::Syntax("Unexpected <EOF>.".into()))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.as_slice().first()
    }

    fn peek_punct(&self, expected: char) -> bool {
        matches!(self.peek(), Some(Token::Punct(c)) if *c == expected)
    }

    fn expect_punct(&mut self, expected: char) -> Result<(), OperationError> {
        match self.next()? {
            Token::Punct(c) if c == expected => Ok(()),
            other => Err(unexpected(&other, &format!("\"{}\"", expected))),
        }
    }

    fn expect_name(&mut self) -> Result<String, OperationError> {
        match self.next()? {
            Token::Name(name) => Ok(name),
            other => Err(unexpected(&other, "Name")),
        }
    }

    /// 开括号已经读过,跳到与之匹配的闭括号之后
    fn skip_until_closed(&mut self, open: char, close: char) -> Result<(), OperationError> {
        let mut depth = 1;
        while depth > 0 {
            match self.next()? {
                Token::Punct(c) if c == open => depth += 1,
                Token::Punct(c) if c == close => depth -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn document(&mut self) -> Result<Vec<Operation>, OperationError> {
        let mut operations = vec![self.operation()?];
        while self.peek().is_some() {
            operations.push(self.operation()?);
        }
        Ok(operations)
    }

    fn operation(&mut self) -> Result<Operation, OperationError> {
        // `{ ... }` 是省略了关键字的 query
        if self.peek_punct('{') {
            return Ok(Operation {
                kind: "query".into(),
                name: None,
                fields: self.selection_set()?,
            });
        }
        let kind = match self.next()? {
            Token::Name(kind) if matches!(kind.as_str(), "query" | "mutation" | "subscription") => {
                kind
            }
            other => return Err(unexpected(&other, "\"mutation\"")),
        };
        let name = match self.peek() {
            Some(Token::Name(_)) => Some(self.expect_name()?),
            _ => None,
        };
        // 变量定义的类型不做检查
        if self.peek_punct('(') {
            self.next()?;
            self.skip_until_closed('(', ')')?;
        }
        Ok(Operation {
            kind,
            name,
            fields: self.selection_set()?,
        })
    }

    fn selection_set(&mut self) -> Result<Vec<Field>, OperationError> {
        self.expect_punct('{')?;
        let mut fields = vec![self.field()?];
        while !self.peek_punct('}') {
            fields.push(self.field()?);
        }
        self.expect_punct('}')?;
        Ok(fields)
    }

    fn field(&mut self) -> Result<Field, OperationError> {
        let response_key = self.expect_name()?;
        let name = if self.peek_punct(':') {
            self.next()?;
            self.expect_name()?
        } else {
            response_key.clone()
        };

        let mut arguments = Vec::new();
        if self.peek_punct('(') {
            self.next()?;
            loop {
                let argument = match self.next()? {
                    Token::Punct(')') => break,
                    Token::Name(argument) => argument,
                    other => return Err(unexpected(&other, "Name")),
                };
                self.expect_punct(':')?;
                arguments.push((argument, self.value()?));
            }
        }
        // 返回字段只有 `status`,子选择集不做检查
        if self.peek_punct('{') {
            self.next()?;
            self.skip_until_closed('{', '}')?;
        }

        Ok(Field {
            response_key,
            name,
            arguments,
        })
    }

    fn value(&mut self) -> Result<ArgumentValue, OperationError> {
        let token = self.next()?;
        let value = match &token {
            Token::Str(value) => ArgumentValue::Str(value.clone()),
            Token::Name(name) if name == "null" => ArgumentValue::Null,
            Token::Punct('$') => ArgumentValue::Variable(self.expect_name()?),
            Token::Punct('{') => {
                self.skip_until_closed('{', '}')?;
                ArgumentValue::Unsupported(unexpected(&token, "String"))
            }
            Token::Punct('[') => {
                self.skip_until_closed('[', ']')?;
                ArgumentValue::Unsupported(unexpected(&token, "String"))
            }
            Token::Name(_) | Token::Other(_) => {
                ArgumentValue::Unsupported(unexpected(&token, "String"))
            }
            Token::Punct(_) => return Err(unexpected(&token, "Value")),
        };
        Ok(value)
    }
}

fn unexpected(token: &Token, expected: &str) -> OperationError {
    let found = match token {
        Token::Name(name) => format!("Name \"{}\"", name),
        Token::Str(value) => format!("String \"{}\"", value),
        Token::Punct(c) => format!("\"{}\"", c),
        Token::Other(other) => format!("\"{}\"", other),
    };
    OperationError::Syntax(format!("Expected {}, found {}.", expected, found))
}

/// 解析整个请求文本,按 `operation_name` 选出要执行的操作并取出 `email` 参数
///
/// 操作只能选中一个 `subscribeEmailToNewsletter` 字段,变量从 `variables` 中取值
pub fn parse_subscribe_mutation(
    query: &str,
    operation_name: Option<&str>,
    variables: &serde_json::Value,
) -> Result<SubscribeMutation, OperationError> {
    let mut parser = Parser {
        tokens: tokenize(query)?.into_iter(),
    };
    let mut operations = parser.document()?;

    let operation = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|operation| operation.name.as_deref() == Some(name))
            .ok_or_else(|| OperationError::UnknownOperation(name.to_string()))?,
        None if operations.len() == 1 => operations.remove(0),
        None => return Err(OperationError::MissingOperationName),
    };
    if operation.kind != "mutation" {
        return Err(OperationError::NotAMutation);
    }

    let mut fields = operation.fields.into_iter();
    let field = fields
        .next()
        .ok_or_else(|| OperationError::Syntax("Expected Name, found \"}\".".into()))?;
    if field.name != SUBSCRIBE_FIELD {
        return Err(OperationError::UnknownField(field.name));
    }
    if let Some(extra) = fields.next() {
        return Err(if extra.name == SUBSCRIBE_FIELD {
            OperationError::MultipleFields
        } else {
            OperationError::UnknownField(extra.name)
        });
    }

    let mut email = None;
    for (argument, value) in field.arguments {
        let value = argument_value(value, variables)?;
        if argument != "email" {
            return Err(OperationError::UnknownArgument(argument));
        }
        email = value;
    }

    Ok(SubscribeMutation {
        response_key: field.response_key,
        email,
    })
}

fn argument_value(
    value: ArgumentValue,
    variables: &serde_json::Value,
) -> Result<Option<String>, OperationError> {
    match value {
        ArgumentValue::Str(value) => Ok(Some(value)),
        ArgumentValue::Null => Ok(None),
        ArgumentValue::Variable(name) => match variables.get(&name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(OperationError::InvalidVariable(name)),
        },
        ArgumentValue::Unsupported(e) => Err(e),
    }
}
