use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    RefundProcessedEvent,
    RequestAcceptedEvent,
    RequestAdmittedEvent,
    RequestVetoedEvent,
    TierChangedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub request_admitted_producer: Vec<EventProducer<RequestAdmittedEvent>>,
    pub request_accepted_producer: Vec<EventProducer<RequestAcceptedEvent>>,
    pub request_vetoed_producer: Vec<EventProducer<RequestVetoedEvent>>,
    pub refund_processed_producer: Vec<EventProducer<RefundProcessedEvent>>,
    pub tier_changed_producer: Vec<EventProducer<TierChangedEvent>>,
}

pub struct EventHandlers {
    pub on_request_admitted: Option<EventHandler<RequestAdmittedEvent>>,
    pub on_request_accepted: Option<EventHandler<RequestAcceptedEvent>>,
    pub on_request_vetoed: Option<EventHandler<RequestVetoedEvent>>,
    pub on_refund_processed: Option<EventHandler<RefundProcessedEvent>>,
    pub on_tier_changed: Option<EventHandler<TierChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_request_admitted: hooks.on_request_admitted.map(|f| EventHandler::new(buffer_size, f)),
            on_request_accepted: hooks.on_request_accepted.map(|f| EventHandler::new(buffer_size, f)),
            on_request_vetoed: hooks.on_request_vetoed.map(|f| EventHandler::new(buffer_size, f)),
            on_refund_processed: hooks.on_refund_processed.map(|f| EventHandler::new(buffer_size, f)),
            on_tier_changed: hooks.on_tier_changed.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_request_admitted {
            result.request_admitted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_accepted {
            result.request_accepted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_request_vetoed {
            result.request_vetoed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_refund_processed {
            result.refund_processed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_tier_changed {
            result.tier_changed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_request_admitted {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_accepted {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_request_vetoed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_refund_processed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_tier_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_request_admitted: Option<Handler<RequestAdmittedEvent>>,
    pub on_request_accepted: Option<Handler<RequestAcceptedEvent>>,
    pub on_request_vetoed: Option<Handler<RequestVetoedEvent>>,
    pub on_refund_processed: Option<Handler<RefundProcessedEvent>>,
    pub on_tier_changed: Option<Handler<TierChangedEvent>>,
}

impl EventHooks {
    pub fn on_request_admitted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestAdmittedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_request_admitted = Some(Arc::new(f));
        self
    }

    pub fn on_request_accepted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestAcceptedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_request_accepted = Some(Arc::new(f));
        self
    }

    pub fn on_request_vetoed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RequestVetoedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_request_vetoed = Some(Arc::new(f));
        self
    }

    pub fn on_refund_processed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(RefundProcessedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_refund_processed = Some(Arc::new(f));
        self
    }

    pub fn on_tier_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TierChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_tier_changed = Some(Arc::new(f));
        self
    }
}
