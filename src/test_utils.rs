use crate::models::domain::{Card, Deck, MarkdownNote, Question, QuestionType, Quiz, QuizOption};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// A quiz that passes every quality check, with `count` questions.
    pub fn sample_quiz(count: usize) -> Quiz {
        let questions = (0..count)
            .map(|i| match i % 3 {
                0 => Question {
                    text: format!("Question {}: which organelle makes ATP?", i + 1),
                    question_type: QuestionType::MultipleChoice,
                    boolean_answer: None,
                    options: ["Mitochondria", "Nucleus", "Ribosome", "Golgi body"]
                        .iter()
                        .enumerate()
                        .map(|(j, text)| QuizOption {
                            text: text.to_string(),
                            is_correct: j == 0,
                        })
                        .collect(),
                    answers: vec![],
                },
                1 => Question {
                    text: format!("Question {}: plant cells have a cell wall.", i + 1),
                    question_type: QuestionType::TrueFalse,
                    boolean_answer: Some(true),
                    options: vec![],
                    answers: vec![],
                },
                _ => Question {
                    text: format!("Question {}: name the green pigment.", i + 1),
                    question_type: QuestionType::TextAnswer,
                    boolean_answer: None,
                    options: vec![],
                    answers: vec!["Chlorophyll".to_string()],
                },
            })
            .collect();

        Quiz {
            title: "Cell Biology".to_string(),
            questions,
        }
    }

    pub fn sample_deck(count: usize) -> Deck {
        Deck {
            title: "Cell Biology".to_string(),
            cards: (0..count)
                .map(|i| Card {
                    front: format!("Term {}", i + 1),
                    back: format!("Definition {}", i + 1),
                })
                .collect(),
        }
    }

    pub fn sample_note() -> MarkdownNote {
        MarkdownNote {
            title: "Photosynthesis".to_string(),
            content: "# Photosynthesis\n\n- Light reactions\n- Calvin cycle".to_string(),
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

/// Minimal HTTP/1.1 server answering every request with one canned response.
#[cfg(test)]
pub mod stub_server {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::{TcpListener, TcpStream},
        sync::{Arc, Mutex},
    };

    pub struct StubHttpServer {
        addr: std::net::SocketAddr,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubHttpServer {
        pub fn start(status: u16, body: &'static str) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));

            let seen = Arc::clone(&requests);
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(stream) = stream else { break };
                    answer(stream, status, body, &seen);
                }
            });

            Self { addr, requests }
        }

        pub fn base_url(&self) -> String {
            format!("http://{}", self.addr)
        }

        /// Request line, headers and body of every request served so far.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn answer(
        mut stream: TcpStream,
        status: u16,
        body: &str,
        seen: &Mutex<Vec<String>>,
    ) -> Option<()> {
        let mut reader = BufReader::new(stream.try_clone().ok()?);
        let mut request = String::new();
        let mut content_length = 0usize;

        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).ok()? == 0 {
                return None;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let end_of_headers = line == "\r\n";
            request.push_str(&line);
            if end_of_headers {
                break;
            }
        }

        let mut payload = vec![0u8; content_length];
        reader.read_exact(&mut payload).ok()?;
        request.push_str(&String::from_utf8_lossy(&payload));
        seen.lock().unwrap().push(request);

        let response = format!(
            "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).ok()?;
        stream.flush().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_sample_quiz_is_clean() {
        let quiz = sample_quiz(7);
        assert_eq!(quiz.questions.len(), 7);
        assert!(quiz.quality_issues().is_empty());
    }

    #[test]
    fn test_sample_deck_and_note() {
        assert_eq!(sample_deck(3).cards.len(), 3);
        assert!(!sample_note().title.is_empty());
    }
}
