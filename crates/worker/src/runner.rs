//! Consumer loop: pull, dispatch, ack or nack, forever.

use std::time::Duration;

use courier_queue::JobConsumer;

use crate::handler::Dispatcher;

/// Run one consumer loop until the task is cancelled.
///
/// Starts with a recovery pass over this consumer's processing list, then
/// alternates between blocking pops and dispatch. Queue transport errors
/// (Redis down) are logged and retried after a pause rather than crashing
/// the loop; handler errors nack the job and let the retry policy decide.
/// A job whose ack or nack could not reach Redis stays in the processing
/// list, where the next recovery pass re-queues it.
pub async fn run_consumer(
    mut consumer: JobConsumer,
    mut dispatcher: Dispatcher,
) -> anyhow::Result<()> {
    consumer.recover().await?;

    loop {
        let delivery = match consumer.next_job().await {
            Ok(Some(delivery)) => delivery,
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(error = %e, "Queue poll failed, backing off");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        let job_id = delivery.job.id;

        match dispatcher.dispatch(&delivery.job).await {
            Ok(()) => {
                if let Err(e) = consumer.ack(&delivery).await {
                    tracing::error!(
                        job_id = %job_id,
                        error = %e,
                        "Ack failed; job stays in processing until recovery"
                    );
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "Job handler failed");
                if let Err(nack_err) = consumer.nack(delivery, &e.to_string()).await {
                    tracing::error!(
                        job_id = %job_id,
                        error = %nack_err,
                        "Nack failed; job stays in processing until recovery"
                    );
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}
