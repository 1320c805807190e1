use crate::call::{RedCall, RedResponse};
use crate::error::RedError;
use crate::hooks::HookPayload;

/// What a parked computation is fed when the scheduler wakes it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// First wake of a plain task.
    Start,
    /// First wake of a hook task: the event that spawned it.
    Hook(HookPayload),
    /// The answer to the request the task yielded last time.
    Reply(RedResponse),
    /// The request failed; an unhandled fault terminates the task.
    Fault(RedError),
}

/// What a computation does with one wake: request something from the
/// editor and park, or finish.
pub enum Step {
    Request(RedCall),
    Done(TaskResult),
}

/// `Ok` carries optional printable return data; `Err` is the stringified
/// fault handed to the `error` hook.
pub type TaskResult = Result<Option<String>, String>;

/// A resumable script computation: run until the next yield, hand out the
/// request, take a response back in. Generators, fibers or compiled script
/// threads all fit; the native rendition below is a continuation chain.
pub trait ScriptThread {
    fn resume(&mut self, input: Resume) -> Step;
}

/// One parked continuation of a [`Routine`].
pub type Stage = Box<dyn FnOnce(Resume) -> Outcome>;

/// What a stage produces: the next request plus the continuation to feed
/// its answer to, or a terminal result.
pub enum Outcome {
    Yield(RedCall, Stage),
    Finish(Option<String>),
    Fail(String),
}

/// Issues `call` and hands the successful reply to `next`. A fault reply
/// becomes a task fault; routines that want to observe faults match on
/// [`Resume`] themselves.
pub fn call_then(
    call: RedCall,
    next: impl FnOnce(RedResponse) -> Outcome + 'static,
) -> Outcome {
    Outcome::Yield(
        call,
        Box::new(move |input| match input {
            Resume::Reply(response) => next(response),
            Resume::Fault(err) => Outcome::Fail(err.to_string()),
            Resume::Start | Resume::Hook(_) => {
                Outcome::Fail("routine resumed without a reply".to_string())
            }
        }),
    )
}

/// Hand-rolled CPS rendition of a coroutine: an optional parked
/// continuation. Resuming takes the continuation, feeds it the input, and
/// parks whatever it yields next.
pub struct Routine {
    next: Option<Stage>,
}

impl Routine {
    pub fn new(start: impl FnOnce(Resume) -> Outcome + 'static) -> Self {
        Self {
            next: Some(Box::new(start)),
        }
    }

    /// A routine that finishes immediately without requesting anything.
    pub fn finished() -> Self {
        Self { next: None }
    }

    pub fn boxed(start: impl FnOnce(Resume) -> Outcome + 'static) -> Box<dyn ScriptThread> {
        Box::new(Self::new(start))
    }
}

impl ScriptThread for Routine {
    fn resume(&mut self, input: Resume) -> Step {
        match self.next.take() {
            None => Step::Done(Ok(None)),
            Some(stage) => match stage(input) {
                Outcome::Yield(call, next) => {
                    self.next = Some(next);
                    Step::Request(call)
                }
                Outcome::Finish(value) => Step::Done(Ok(value)),
                Outcome::Fail(message) => Step::Done(Err(message)),
            },
        }
    }
}

/// Runs another thread as this routine's continuation, forwarding wakes
/// until it finishes. Lets a dispatching routine (the keymap handler)
/// become the routine it resolved.
pub fn delegate(mut thread: Box<dyn ScriptThread>, input: Resume) -> Outcome {
    match thread.resume(input) {
        Step::Request(call) => {
            Outcome::Yield(call, Box::new(move |next_input| delegate(thread, next_input)))
        }
        Step::Done(Ok(value)) => Outcome::Finish(value),
        Step::Done(Err(message)) => Outcome::Fail(message),
    }
}

#[cfg(test)]
mod tests {
    use super::{Outcome, Resume, Routine, ScriptThread, Step, call_then, delegate};
    use crate::call::{RedCall, RedResponse};
    use crate::error::RedError;

    #[test]
    fn routine_should_park_between_request_and_reply() {
        let mut routine = Routine::new(|_| {
            call_then(RedCall::CurrentBufferId, |response| {
                match response.into_buffer_id() {
                    Ok(_) => Outcome::Finish(Some("saw buffer".to_string())),
                    Err(err) => Outcome::Fail(err.to_string()),
                }
            })
        });

        let step = routine.resume(Resume::Start);
        let Step::Request(call) = step else {
            panic!("expected a request");
        };
        assert_eq!(call, RedCall::CurrentBufferId);

        let step = routine.resume(Resume::Reply(RedResponse::Buffer(Default::default())));
        let Step::Done(result) = step else {
            panic!("expected completion");
        };
        assert_eq!(result, Ok(Some("saw buffer".to_string())));
    }

    #[test]
    fn fault_reply_should_fail_the_routine() {
        let mut routine = Routine::new(|_| {
            call_then(RedCall::CurrentBufferId, |_| Outcome::Finish(None))
        });
        routine.resume(Resume::Start);

        let step = routine.resume(Resume::Fault(RedError::script_fault("nope")));
        let Step::Done(result) = step else {
            panic!("expected completion");
        };
        assert_eq!(result, Err("script_fault: nope".to_string()));
    }

    #[test]
    fn exhausted_routine_should_report_done() {
        let mut routine = Routine::finished();
        assert!(matches!(routine.resume(Resume::Start), Step::Done(Ok(None))));
    }

    #[test]
    fn delegate_should_forward_every_wake_to_the_inner_thread() {
        let inner = Routine::boxed(|_| {
            call_then(RedCall::Yield, |_| {
                call_then(RedCall::CurrentBufferId, |_| Outcome::Finish(None))
            })
        });
        let mut outer = Routine::new(move |input| delegate(inner, input));

        assert!(matches!(
            outer.resume(Resume::Start),
            Step::Request(RedCall::Yield)
        ));
        assert!(matches!(
            outer.resume(Resume::Reply(RedResponse::None)),
            Step::Request(RedCall::CurrentBufferId)
        ));
        assert!(matches!(
            outer.resume(Resume::Reply(RedResponse::Buffer(Default::default()))),
            Step::Done(Ok(None))
        ));
    }
}
