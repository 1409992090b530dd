use std::sync::Arc;

use mongodb::Database;
use shiftdesk_config::Settings;
use shiftdesk_services::{
    AbsenceWorkflow, AssistantDeps, AuthService, BriefingService, Dispatcher, LocalClock,
    MediaDecoder, Stores, TrafficAlertJob, WhatsAppAgent,
    providers::{
        AzureMapsClient, AzureOpenAiClient, LanguageModel, Mailer, SmtpMailer, TrafficProvider,
    },
    whatsapp::{CloudApiClient, OutboundPolicy, TemplateRegistry, WhatsAppTransport},
};
use shiftdesk_speech::{AsrBackend, OggOpusTranscoder, SpeechConfig, Transcoder, asr::AzureSpeechBackend};

/// Remote capabilities. Built from settings in production and replaced by
/// fakes in tests.
#[derive(Clone)]
pub struct Providers {
    pub llm: Arc<dyn LanguageModel>,
    pub maps: Arc<dyn TrafficProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub whatsapp: Arc<dyn WhatsAppTransport>,
    pub transcoder: Arc<dyn Transcoder>,
    pub asr: Arc<dyn AsrBackend>,
}

impl Providers {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self {
            llm: Arc::new(AzureOpenAiClient::new(settings.llm.clone())),
            maps: Arc::new(AzureMapsClient::new(settings.maps.clone())),
            mailer: Arc::new(SmtpMailer::new(&settings.mail)?),
            whatsapp: Arc::new(CloudApiClient::new(settings.whatsapp.clone())),
            transcoder: Arc::new(OggOpusTranscoder),
            asr: Arc::new(AzureSpeechBackend::new(speech_config(settings))),
        })
    }
}

pub fn speech_config(settings: &Settings) -> SpeechConfig {
    let speech = &settings.speech;
    SpeechConfig {
        subscription_key: speech.subscription_key.clone(),
        region: speech.region.clone(),
        default_language: speech.default_language.clone(),
        timeout_secs: speech.timeout_secs,
        initial_silence_timeout_ms: speech.initial_silence_timeout_ms,
        end_silence_timeout_ms: speech.end_silence_timeout_ms,
        endpoint: speech.endpoint.clone(),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub stores: Stores,
    pub clock: LocalClock,
    pub registry: Arc<TemplateRegistry>,
    pub policy: Arc<OutboundPolicy>,
    pub dispatcher: Arc<Dispatcher>,
    pub absences: Arc<AbsenceWorkflow>,
    pub briefing: Arc<BriefingService>,
    pub agent: Arc<WhatsAppAgent>,
    pub traffic_alerts: Arc<TrafficAlertJob>,
    pub maps: Arc<dyn TrafficProvider>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> anyhow::Result<Self> {
        let providers = Providers::from_settings(&settings)?;
        Ok(Self::with_providers(db, settings, providers))
    }

    pub fn with_providers(db: Database, settings: Settings, providers: Providers) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let stores = Stores::new(&db);
        let clock = LocalClock::new(&settings.app.timezone);

        let registry = Arc::new(TemplateRegistry::new(stores.whatsapp_settings.clone()));
        let policy = Arc::new(OutboundPolicy::new(
            providers.whatsapp.clone(),
            stores.conversations.clone(),
            registry.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            stores.notifications.clone(),
            providers.mailer.clone(),
            policy.clone(),
            settings.notifications.max_concurrency,
        ));
        let absences = Arc::new(AbsenceWorkflow::new(
            stores.clone(),
            dispatcher.clone(),
            clock,
        ));
        let briefing = Arc::new(BriefingService::new(
            stores.clone(),
            providers.maps.clone(),
            clock,
        ));
        let traffic_alerts = Arc::new(TrafficAlertJob::new(
            stores.clone(),
            providers.maps.clone(),
            dispatcher.clone(),
            clock,
        ));

        let speech = speech_config(&settings);
        let media = Arc::new(MediaDecoder::new(
            providers.whatsapp.clone(),
            providers.transcoder.clone(),
            providers.asr.clone(),
            &speech,
        ));
        let deps = Arc::new(AssistantDeps {
            stores: stores.clone(),
            clock,
            llm: providers.llm.clone(),
            maps: providers.maps.clone(),
            dispatcher: dispatcher.clone(),
            absences: absences.clone(),
            policy: policy.clone(),
            registry: registry.clone(),
            settings: settings.assistant.clone(),
        });
        let agent = Arc::new(WhatsAppAgent::new(deps, media, speech.default_language));

        Self {
            db,
            settings,
            auth,
            stores,
            clock,
            registry,
            policy,
            dispatcher,
            absences,
            briefing,
            agent,
            traffic_alerts,
            maps: providers.maps,
        }
    }
}
